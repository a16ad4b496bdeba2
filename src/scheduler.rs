use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::gateway::GatewayClient;
use crate::handlers::rank;
use crate::relay::WebhookRelay;

/// Daily post time: 08:00 wall clock in America/Sao_Paulo.
const POST_HOUR: u32 = 8;

// Sao Paulo stopped observing DST in 2019; a fixed UTC-3 shift is enough.
fn sao_paulo_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("static offset is in range")
}

/// Time remaining until the next 08:00 Sao Paulo wall clock. If 08:00 has
/// already passed today, the target rolls over to tomorrow.
pub fn delay_until_next_run(now: DateTime<Utc>) -> Duration {
    let offset = sao_paulo_offset();
    let local_now = now.with_timezone(&offset);
    let post_time = NaiveTime::from_hms_opt(POST_HOUR, 0, 0).expect("static time is valid");

    let mut target_date = local_now.date_naive();
    if local_now.time() >= post_time {
        target_date = target_date.succ_opt().expect("not at the end of the calendar");
    }

    let target = offset
        .from_local_datetime(&target_date.and_time(post_time))
        .single()
        .expect("fixed offset times are unambiguous");

    (target.with_timezone(&Utc) - now)
        .to_std()
        .unwrap_or_default()
}

/// Spawn the self-re-arming daily rank task.
///
/// The task sleeps until the next 08:00, runs the fetch-and-post flow, and
/// re-arms regardless of the outcome, for the lifetime of the process. The
/// returned handle is the cancellation handle; nothing is persisted, so a
/// restart simply recomputes the next 08:00 from the current clock.
pub fn spawn_daily_rank(
    gateway: Arc<dyn GatewayClient>,
    relay: Arc<WebhookRelay>,
    rank_url: String,
    channel_id: String,
) -> JoinHandle<()> {
    info!("Setting up daily rank scheduler");

    tokio::spawn(async move {
        loop {
            let delay = delay_until_next_run(Utc::now());
            info!(
                "Scheduled next daily rank update in {} hours and {} minutes",
                delay.as_secs() / 3600,
                (delay.as_secs() % 3600) / 60
            );
            tokio::time::sleep(delay).await;

            if let Err(e) =
                rank::fetch_and_post(gateway.as_ref(), &relay, &rank_url, &channel_id).await
            {
                error!("Error in scheduled rank update: {:#}", e);
            }
        }
    })
}
