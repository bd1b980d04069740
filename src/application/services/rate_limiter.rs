//! # Rate Limiter
//!
//! 連絡先サービスへの送信レートを制限するスライディングウィンドウ方式のリミッター
//!
//! 全ワーカーが1つのインスタンスを共有する。許可の判定と記録はロック内で行い、
//! 待機中はロックを保持しない。サーバーから flood-wait を受けた場合は
//! `cool_down` でローカルの枠に関係なく全体の送信を止める

use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::domain::errors::ImportError;

pub const DEFAULT_MAX_REQUESTS: u32 = 30;
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// レート制限の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// ウィンドウ内の最大リクエスト数
    pub max_requests: u32,
    /// ウィンドウの長さ
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
        }
    }
}

// Upper bound for instants derived from server or config durations.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `base + duration`。溢れる場合は十分先の時刻で打ち止めにする
fn saturating_instant(base: Instant, duration: Duration) -> Instant {
    base.checked_add(duration.min(FAR_FUTURE))
        .or_else(|| base.checked_add(Duration::from_secs(86400)))
        .unwrap_or(base)
}

/// リミッターの内部状態
#[derive(Debug, Default)]
struct RateLimiterState {
    /// ウィンドウ内で許可した時刻
    grants: VecDeque<Instant>,
    /// サーバー指定の待機が明ける時刻
    cooldown_until: Option<Instant>,
}

impl RateLimiterState {
    /// 次に許可できる時刻。今すぐ許可できる場合は `None`
    fn next_slot(&mut self, now: Instant, settings: &RateLimitSettings) -> Option<Instant> {
        if let Some(until) = self.cooldown_until {
            if until > now {
                return Some(until);
            }
            self.cooldown_until = None;
        }

        while let Some(front) = self.grants.front() {
            if now.duration_since(*front) >= settings.window {
                self.grants.pop_front();
            } else {
                break;
            }
        }

        if (self.grants.len() as u32) < settings.max_requests {
            None
        } else {
            self.grants
                .front()
                .map(|oldest| saturating_instant(*oldest, settings.window))
        }
    }
}

/// 送信レートリミッター
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    deadline: Option<Instant>,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    /// 新しいリミッターを作成
    pub fn new(settings: RateLimitSettings) -> Self {
        let settings = RateLimitSettings {
            max_requests: settings.max_requests.max(1),
            ..settings
        };
        Self {
            settings,
            deadline: None,
            state: Mutex::new(RateLimiterState::default()),
        }
    }

    /// 実行全体の期限を設定する
    ///
    /// 期限を超える待機が必要になった時点で `acquire` は失敗する
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// 送信許可を1つ取得する
    ///
    /// キャンセルしても状態は変わらない（許可の記録は待機の後、ロック内で行う）
    ///
    /// # Errors
    ///
    /// 次の枠が実行期限より後の場合 `ImportError::RateLimitTimeout`
    pub async fn acquire(&self) -> Result<(), ImportError> {
        loop {
            let wait_until = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                if self.deadline.is_some_and(|deadline| now > deadline) {
                    return Err(ImportError::RateLimitTimeout);
                }
                match state.next_slot(now, &self.settings) {
                    None => {
                        state.grants.push_back(now);
                        return Ok(());
                    }
                    Some(at) => at,
                }
            };

            if self.deadline.is_some_and(|deadline| wait_until > deadline) {
                return Err(ImportError::RateLimitTimeout);
            }

            debug!(
                "Rate limiter waiting {}ms for next slot",
                wait_until.saturating_duration_since(Instant::now()).as_millis()
            );
            sleep_until(wait_until).await;
        }
    }

    /// サーバー指定の待機時間を反映する
    ///
    /// 既存の待機より長い場合のみ延長する
    pub async fn cool_down(&self, duration: Duration) {
        let mut state = self.state.lock().await;
        let until = saturating_instant(Instant::now(), duration);
        state.cooldown_until = Some(match state.cooldown_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// 待機中の cool-down が明ける時刻
    pub async fn cooldown_until(&self) -> Option<Instant> {
        self.state.lock().await.cooldown_until
    }
}
