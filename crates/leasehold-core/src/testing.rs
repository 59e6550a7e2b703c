//! テスト用のダブル（ビルド回数・判定回数・破棄回数を数える）

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::BoxError;
use crate::ports::{BuildStrategy, Disposable, RenewPolicy, RenewalStats};

/// RenewalStats の固定値スタブ
#[derive(Debug, Clone, Copy, Default)]
pub struct StubStats {
    pub age: Duration,
    pub errors: u32,
    pub usage: u64,
}

impl StubStats {
    pub fn with_age(mut self, age: Duration) -> Self {
        self.age = age;
        self
    }

    pub fn with_errors(mut self, errors: u32) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_usage(mut self, usage: u64) -> Self {
        self.usage = usage;
        self
    }
}

impl RenewalStats for StubStats {
    fn age(&self) -> Duration {
        self.age
    }

    fn error_count(&self) -> u32 {
        self.errors
    }

    fn usage_count(&self) -> u64 {
        self.usage
    }
}

/// 破棄回数を記録するテスト用 Resource
#[derive(Debug)]
pub struct TestConn {
    pub serial: usize,
    pub disposals: AtomicUsize,
    pub fail_dispose: bool,
}

impl TestConn {
    pub fn new(serial: usize) -> Self {
        Self {
            serial,
            disposals: AtomicUsize::new(0),
            fail_dispose: false,
        }
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl Disposable for TestConn {
    fn dispose(&self) -> Result<(), BoxError> {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        if self.fail_dispose {
            return Err(format!("conn {} refused to close", self.serial).into());
        }
        Ok(())
    }
}

/// build() の回数を数える BuildStrategy
///
/// clone したものはカウンタを共有します。
#[derive(Debug, Clone, Default)]
pub struct CountingBuild {
    builds: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    fail_dispose: bool,
}

impl CountingBuild {
    pub fn new() -> Self {
        Self::default()
    }

    /// dispose() が失敗する TestConn を作る
    pub fn failing_dispose() -> Self {
        Self {
            fail_dispose: true,
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl BuildStrategy<TestConn> for CountingBuild {
    fn build(&self) -> Result<TestConn, BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("build refused".into());
        }
        let serial = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        let mut conn = TestConn::new(serial);
        conn.fail_dispose = self.fail_dispose;
        Ok(conn)
    }
}

/// shall_renew() の回数を数え、切り替え可能な答えを返す RenewPolicy
#[derive(Debug, Clone, Default)]
pub struct CountingPolicy {
    calls: Arc<AtomicUsize>,
    answer: Arc<AtomicBool>,
}

impl CountingPolicy {
    pub fn answering(answer: bool) -> Self {
        let policy = Self::default();
        policy.set_answer(answer);
        policy
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_answer(&self, answer: bool) {
        self.answer.store(answer, Ordering::SeqCst);
    }
}

impl RenewPolicy for CountingPolicy {
    fn shall_renew(&self, _stats: &dyn RenewalStats) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.load(Ordering::SeqCst)
    }
}
