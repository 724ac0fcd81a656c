pub mod api;
pub mod core;

/// 初始化日志，默认 info，可用 RUST_LOG 覆盖；重复调用无副作用
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
