/// Common startup/shutdown shape for long-lived core components (the
/// compile-state registry, the query queue, a query worker).
pub trait Lifecycle {
    /// 初始化
    fn setup(&mut self);

    /// 启动
    fn start(&mut self);

    /// 关闭
    fn stop(&mut self);

    /// 暂停服务，服务挂起
    fn pause(&mut self);
}