fn main() {
    #[cfg(feature = "esp")]
    {
        // cfg.toml が無い場合は toml-cfg のデフォルト値でビルドされる
        if !std::path::Path::new("cfg.toml").exists() {
            println!("cargo:warning=cfg.toml が見つかりません。cfg.toml.example をコピーして設定してください。");
        }
        println!("cargo:rerun-if-changed=cfg.toml");
        embuild::espidf::sysenv::output();
    }
}
