//! INAIRA Monitor 主程序入口
//!
//! ODIN INAIRA 相机控制与帧状态监控客户端

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    inaira_monitor::core::app::main().await
}
