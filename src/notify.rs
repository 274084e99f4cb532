//! Post-run notification fan-out. Strictly best-effort: a failed delivery is
//! logged and never changes the run's outcome or exit code.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use crate::config::{LarkConfig, NotificationsConfig, TelegramConfig};
use crate::runner::suite::SuiteResult;

pub async fn send_notifications(config: &NotificationsConfig, result: &SuiteResult) {
    if config.telegram.enabled {
        if let Err(e) = send_telegram(&config.telegram, result).await {
            log::warn!("telegram notification failed: {:#}", e);
        } else {
            log::info!("telegram notification sent");
        }
    }
    if config.lark.enabled {
        if let Err(e) = send_lark(&config.lark, result).await {
            log::warn!("lark notification failed: {:#}", e);
        } else {
            log::info!("lark notification sent");
        }
    }
}

async fn send_telegram(config: &TelegramConfig, result: &SuiteResult) -> anyhow::Result<()> {
    let url = format!(
        "https://api.telegram.org/bot{}/sendMessage",
        config.bot_token
    );
    let payload = json!({
        "chat_id": config.chat_id,
        "text": build_telegram_message(result),
        "parse_mode": "Markdown",
    });

    let response = reqwest::Client::new()
        .post(&url)
        .json(&payload)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("telegram API returned {}: {}", status, body);
    }
    Ok(())
}

/// Markdown summary for Telegram. At most five failed scenarios are listed
/// and advisory insights are cut to 200 characters.
pub fn build_telegram_message(result: &SuiteResult) -> String {
    let rate = result.success_rate();
    let status_emoji = if rate >= 90.0 {
        "✅"
    } else if rate >= 70.0 {
        "⚠️"
    } else {
        "❌"
    };
    let duration_s = result.summary().total_duration_ms as f64 / 1000.0;

    let mut message = format!(
        "{} **Storefront Test Results**\n\n\
         🎯 **Target**: {}\n\
         📊 **Suite**: {}\n\n\
         📈 **Summary**:\n\
         • Total: {}\n\
         • Passed: {} ✅\n\
         • Failed: {} ❌\n\
         • Success Rate: {:.1}%\n\
         • Duration: {:.1}s\n\n\
         🔍 **Failed Scenarios**:\n",
        status_emoji,
        result.site,
        result.suite,
        result.total,
        result.passed,
        result.failed,
        rate,
        duration_s
    );

    let failed: Vec<_> = result.scenarios.iter().filter(|s| !s.succeeded()).collect();
    if failed.is_empty() {
        message.push_str("None! 🎉\n");
    } else {
        for scenario in failed.iter().take(5) {
            let error = scenario.error.as_deref().unwrap_or("unknown error");
            message.push_str(&format!("• {}: {}\n", scenario.name, error));
        }
    }

    if let Some(insights) = &result.performance.insights {
        message.push_str(&format!("\n🤖 **Insights**: {}\n", truncate(insights, 200)));
    }

    message.push_str(&format!(
        "\n⏰ **Completed**: {}",
        result.finished_at.format("%Y-%m-%d %H:%M:%S")
    ));
    message
}

async fn send_lark(config: &LarkConfig, result: &SuiteResult) -> anyhow::Result<()> {
    let mut payload = json!({
        "msg_type": "text",
        "content": { "text": build_lark_text(result) },
    });
    // Signing is optional on Lark webhooks; only add it when a secret is set.
    if !config.secret.is_empty() {
        let timestamp = Utc::now().timestamp();
        payload["timestamp"] = json!(timestamp.to_string());
        payload["sign"] = json!(lark_sign(&config.secret, timestamp)?);
    }

    let response = reqwest::Client::new()
        .post(&config.webhook_url)
        .json(&payload)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("lark webhook returned {}: {}", status, body);
    }
    Ok(())
}

fn build_lark_text(result: &SuiteResult) -> String {
    let mut text = format!(
        "Storefront test results for {}\nSuite: {} | Passed: {}/{} | Success rate: {:.1}%\n",
        result.site,
        result.suite,
        result.passed,
        result.total,
        result.success_rate()
    );
    for name in result.performance.failed_scenarios.iter().take(5) {
        text.push_str(&format!("Failed: {}\n", name));
    }
    text
}

/// Lark webhook signature: HMAC-SHA256 keyed on `"{timestamp}\n{secret}"`
/// over an empty message, base64 encoded.
pub fn lark_sign(secret: &str, timestamp: i64) -> anyhow::Result<String> {
    let key = format!("{}\n{}", timestamp, secret);
    let mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| anyhow::anyhow!("hmac key rejected: {}", e))?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
