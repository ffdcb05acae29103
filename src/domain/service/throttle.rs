use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::CustomerId;

/// 連続注文の抑止
/// 顧客ごとに最後に注文を作成した時刻を保持し、待機時間内の作成を拒否する
pub struct CreateThrottle {
    cooldown: Duration,
    last_created: Mutex<HashMap<CustomerId, DateTime<Utc>>>,
}

/// 作成枠の仮押さえ
///
/// `commit` されずに破棄された場合は記録を取り消す。
/// 作成処理が途中で失敗しても、失敗した作成は待機時間の起点にならない
#[must_use = "commit しない場合は破棄時に取り消される"]
pub struct ThrottlePermit<'a> {
    throttle: &'a CreateThrottle,
    customer_id: CustomerId,
    stamped_at: DateTime<Utc>,
    committed: bool,
}

impl ThrottlePermit<'_> {
    /// 作成成功として記録を確定する
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for ThrottlePermit<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut last_created = self.throttle.entries();
        // 他の作成が記録を上書きしていなければ取り消す
        if last_created.get(&self.customer_id) == Some(&self.stamped_at) {
            last_created.remove(&self.customer_id);
        }
    }
}

impl CreateThrottle {
    /// 待機時間の既定値（秒）
    pub const DEFAULT_COOLDOWN_SECONDS: i64 = 10;

    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_created: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CustomerId, DateTime<Utc>>> {
        self.last_created
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 作成枠を確認し、同じロックの中で記録する
    ///
    /// 同じ顧客の同時の作成は1件だけが通り、残りは待機時間のエラーになる。
    /// 待機時間を過ぎた記録はこの時点で取り除く
    ///
    /// # Returns
    /// * `Ok(ThrottlePermit)` - 作成してよい。成功したら `commit` する
    /// * `Err(DomainError::Throttled)` - 待機時間内（再試行までの秒数は切り上げ）
    pub fn try_acquire(
        &self,
        customer_id: CustomerId,
        now: DateTime<Utc>,
    ) -> Result<ThrottlePermit<'_>, DomainError> {
        let mut last_created = self.entries();
        last_created.retain(|_, last| now.signed_duration_since(*last) < self.cooldown);

        if let Some(last) = last_created.get(&customer_id).copied() {
            let remaining = self.cooldown - now.signed_duration_since(last);
            let mut retry_after = remaining.num_seconds();
            if remaining > Duration::seconds(retry_after) {
                retry_after += 1;
            }
            return Err(DomainError::Throttled {
                retry_after_seconds: retry_after.max(1) as u64,
            });
        }

        last_created.insert(customer_id, now);
        Ok(ThrottlePermit {
            throttle: self,
            customer_id,
            stamped_at: now,
            committed: false,
        })
    }

    #[cfg(test)]
    fn tracked_customers(&self) -> usize {
        self.entries().len()
    }
}

impl Default for CreateThrottle {
    fn default() -> Self {
        Self::new(Duration::seconds(Self::DEFAULT_COOLDOWN_SECONDS))
    }
}
