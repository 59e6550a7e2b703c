//! BuildChain - factory と設定ステップを順に適用する BuildStrategy
//!
//! ベースとなる factory で Resource を作り、`then()` で追加した設定ステップを
//! 登録順に適用します。どこかのステップが失敗した時点で build 全体が失敗します。

use std::fmt;

use crate::domain::BoxError;
use crate::ports::BuildStrategy;

type Factory<T> = Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>;
type Step<T> = Box<dyn Fn(T) -> Result<T, BoxError> + Send + Sync>;

/// BuildChain は factory + 設定ステップの列
///
/// # 使用例
/// ```ignore
/// let build = BuildChain::new(move || Connection::open(&endpoint))
///     .then(|conn| conn.with_timeout(Duration::from_secs(300)))
///     .then(|conn| conn.with_header("user-agent", "leasehold"));
/// ```
pub struct BuildChain<T> {
    factory: Factory<T>,
    steps: Vec<Step<T>>,
}

impl<T> BuildChain<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            steps: Vec::new(),
        }
    }

    /// 設定ステップを末尾に追加
    pub fn then<S>(mut self, step: S) -> Self
    where
        S: Fn(T) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl<T> BuildStrategy<T> for BuildChain<T> {
    fn build(&self) -> Result<T, BoxError> {
        self.steps
            .iter()
            .try_fold((self.factory)()?, |resource, step| step(resource))
    }
}

impl<T> fmt::Debug for BuildChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildChain")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, PartialEq)]
    struct Client {
        base: String,
        headers: Vec<String>,
    }

    #[test]
    fn factory_alone_builds() {
        let chain = BuildChain::new(|| Ok(Client { base: "https://a".into(), ..Client::default() }));
        assert_eq!(chain.step_count(), 0);
        assert_eq!(chain.build().unwrap().base, "https://a");
    }

    #[test]
    fn steps_apply_in_order() {
        let chain = BuildChain::new(|| Ok(Client::default()))
            .then(|mut c: Client| {
                c.headers.push("accept".into());
                Ok(c)
            })
            .then(|mut c: Client| {
                c.headers.push("user-agent".into());
                Ok(c)
            });

        assert_eq!(chain.build().unwrap().headers, vec!["accept", "user-agent"]);
    }

    #[test]
    fn failing_step_aborts_build() {
        let after = Arc::new(AtomicUsize::new(0));
        let seen = after.clone();
        let chain = BuildChain::new(|| Ok(Client::default()))
            .then(|_: Client| Err("bad header".into()))
            .then(move |c: Client| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(c)
            });

        let err = chain.build().unwrap_err();
        assert_eq!(err.to_string(), "bad header");
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn every_build_is_independent() {
        let chain = BuildChain::new(|| Ok(Client::default())).then(|mut c: Client| {
            c.headers.push("x".into());
            Ok(c)
        });

        let first = chain.build().unwrap();
        let second = chain.build().unwrap();
        assert_eq!(first.headers.len(), 1);
        assert_eq!(second.headers.len(), 1);
    }
}
