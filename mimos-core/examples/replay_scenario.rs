//! Scenario replay example demonstrating basic usage
//!
//! Replays a small recorded scenario against a simulated device so the
//! whole pipeline can be seen without any hardware attached.

use async_trait::async_trait;
use mimos_core::prelude::*;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;

/// Pretends to be a device: every tool succeeds, except the second
/// `click`, which fails once before recovering.
struct SimulatedDevice {
    clicks: std::sync::atomic::AtomicU32,
}

#[async_trait]
impl DeviceDriver for SimulatedDevice {
    async fn perform(
        &self,
        tool: &str,
        params: &Params,
    ) -> std::result::Result<Value, DeviceError> {
        println!("  [device] {tool} {}", Value::Object(params.clone()));
        if tool == "click" {
            let call = self
                .clicks
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 1 {
                return Err(DeviceError::Execution(
                    "element 'Checkout' not yet visible".to_string(),
                ));
            }
        }
        Ok(json!(true))
    }

    async fn screenshot(
        &self,
        path: &Path,
        _device_id: Option<&str>,
    ) -> std::result::Result<bool, DeviceError> {
        println!("  [device] screenshot -> {}", path.display());
        Ok(true)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("🎬 Scenario Replay Example");
    println!("==========================\n");

    // A recorded session, written where the example can find it again.
    let scenario_path = std::env::temp_dir().join("mimos_example_scenario.json");
    std::fs::write(
        &scenario_path,
        serde_json::to_string_pretty(&json!({
            "schema_version": "1.0",
            "metadata": {
                "name": "checkout_demo",
                "created_at": "2025-11-03T09:15:00",
                "device": {"serial": "emulator-5554"}
            },
            "actions": [
                {"tool": "start_app", "params": {"package_name": "com.shop.app"}, "delay_before_ms": 0},
                {"tool": "click", "params": {"selector": "Cart", "selector_type": "text"}, "delay_before_ms": 400},
                {"tool": "click", "params": {"selector": "Checkout", "selector_type": "text"}, "delay_before_ms": 250}
            ]
        }))?,
    )?;
    println!("Scenario written to {}\n", scenario_path.display());

    // Replay at double speed; the flaky click gets one retry.
    let config = ReplayConfig::new()
        .with_retry_attempts(3)
        .with_retry_delay_ms(200)
        .with_speed_multiplier(2.0)
        .with_wait_for_screen_on(false);
    config.validate()?;

    let driver = Arc::new(SimulatedDevice {
        clicks: std::sync::atomic::AtomicU32::new(0),
    });
    let engine = ReplayEngine::new(driver, config).with_device_id("emulator-5554");

    println!("Replaying...");
    let report = engine.replay(&scenario_path).await;

    println!("\n📋 Report");
    println!("  success:       {}", report.success);
    println!(
        "  actions:       {}/{} succeeded",
        report.execution.successful_actions, report.execution.total_actions
    );
    println!("  success rate:  {}%", report.execution.success_rate);
    println!("  total retries: {}", report.execution.total_retries);
    println!(
        "  avg duration:  {} ms",
        report.execution.avg_action_duration_ms
    );

    let report_path = std::env::temp_dir().join("mimos_example_report.json");
    report.save(&report_path)?;
    println!("\n✓ Full report saved to {}", report_path.display());

    Ok(())
}
