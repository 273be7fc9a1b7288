use crate::error::CommandError;
use crate::modules::commands::router::Invocation;
use serenity::all::EditMessage;
use std::time::{Duration, Instant};

const GATEWAY_PROBE_URL: &str = "https://discord.com/api/v10/gateway";

/// Sentinel used when a probe fails outright, matching the thresholds below.
const PROBE_FAILED_MS: u128 = 999;

/// DNS + HTTP + WebSocket round-trip timings with tuning suggestions.
pub async fn nettest(inv: Invocation) -> Result<(), CommandError> {
    let mut response = String::from("🌐 **Network Diagnostic**\n");

    let start = Instant::now();
    let dns_ms = match tokio::net::lookup_host(("discord.com", 443)).await {
        Ok(_) => {
            let ms = start.elapsed().as_millis();
            response.push_str(&format!("🔍 DNS Resolution: ✅ {ms}ms\n"));
            ms
        }
        Err(_) => {
            response.push_str("🔍 DNS Resolution: ❌ Failed\n");
            PROBE_FAILED_MS
        }
    };

    let start = Instant::now();
    let http_ms = match inv.data.http.get(GATEWAY_PROBE_URL).send().await {
        Ok(resp) if resp.status().is_success() => {
            let ms = start.elapsed().as_millis();
            response.push_str(&format!("🌐 HTTP Connection: ✅ {ms}ms\n"));
            ms
        }
        Ok(resp) => {
            response.push_str(&format!("🌐 HTTP Connection: ❌ Status: {}\n", resp.status()));
            PROBE_FAILED_MS
        }
        Err(_) => {
            response.push_str("🌐 HTTP Connection: ❌ Failed\n");
            PROBE_FAILED_MS
        }
    };

    let ws_ms = inv
        .data
        .gateway_latency(&inv.ctx)
        .await
        .map(|latency| latency.as_millis())
        .unwrap_or(PROBE_FAILED_MS);
    response.push_str(&format!("📡 WebSocket: {ws_ms}ms\n"));

    let mut suggestions = Vec::new();
    if dns_ms > 100 {
        suggestions.push("• Try switching DNS to 1.1.1.1");
    }
    if http_ms > 200 {
        suggestions.push("• Check firewall/antivirus settings");
    }
    if ws_ms > 200 {
        suggestions.push("• Close bandwidth-heavy programs");
        suggestions.push("• Check VPN/proxy settings");
    }
    if !suggestions.is_empty() {
        response.push_str(&format!("💡 Suggestions:\n{}", suggestions.join("\n")));
    }

    inv.msg.channel_id.say(&inv.ctx.http, response).await?;
    Ok(())
}

/// Five timed edit round-trips against the REST API.
pub async fn speedtest(inv: Invocation) -> Result<(), CommandError> {
    let mut message = inv
        .msg
        .channel_id
        .say(&inv.ctx.http, "🔄 Testing command response speed...")
        .await?;

    let mut results: Vec<u128> = Vec::with_capacity(5);
    for i in 0..5 {
        let start = Instant::now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        results.push(start.elapsed().as_millis());

        message
            .edit(
                &inv.ctx,
                EditMessage::new().content(format!("🔄 Testing... {}/5", i + 1)),
            )
            .await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    let avg = results.iter().sum::<u128>() as f64 / results.len() as f64;
    let best = results.iter().min().copied().unwrap_or(0);
    let worst = results.iter().max().copied().unwrap_or(0);

    let rating = if avg < 50.0 {
        "🟢 Excellent"
    } else if avg < 100.0 {
        "🟡 Good"
    } else if avg < 200.0 {
        "🟠 Fair"
    } else {
        "🔴 Poor"
    };

    let raw = results
        .iter()
        .map(|ms| format!("{ms}ms"))
        .collect::<Vec<_>>()
        .join(" | ");
    let response = format!(
        "⚡ **Speed Test Results**\n\
         📊 Average: {avg:.1}ms\n\
         🟢 Best: {best}ms\n\
         🔴 Worst: {worst}ms\n\
         📈 Rating: {rating}\n\
         📋 Raw Results: {raw}"
    );

    message
        .edit(&inv.ctx, EditMessage::new().content(response))
        .await?;
    Ok(())
}
