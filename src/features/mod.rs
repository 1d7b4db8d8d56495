/// 健康检查
pub mod health;
/// 分享缩略图渲染
pub mod thumbnail;
