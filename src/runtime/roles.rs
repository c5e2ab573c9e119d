use std::{any::Any, future::Future};

use tokio::task::JoinSet;
use tracing::error;
use zrelay_error::RelayError;

use crate::pubsub::{PublishSummary, SubscribeSummary};

/// Чем закончилась роль, завершившаяся без фатальной ошибки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleExit {
    Forwarder,
    Publisher(PublishSummary),
    Subscriber(SubscribeSummary),
    /// Задача снята до завершения.
    Aborted,
}

pub type RoleResult = Result<RoleExit, RelayError>;

/// Набор задач ролей.
///
/// Каждая роль запускается отдельной задачей; обёртка в `JoinSet` ждёт её и
/// превращает панику в фатальную ошибку с именем роли.
#[derive(Default)]
pub struct RoleSet {
    set: JoinSet<(String, RoleResult)>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(
        &mut self,
        role: impl Into<String>,
        fut: F,
    ) where
        F: Future<Output = RoleResult> + Send + 'static,
    {
        let role = role.into();
        let handle = tokio::spawn(fut);

        self.set.spawn(async move {
            let res = match handle.await {
                Ok(res) => res,
                Err(join) if join.is_panic() => {
                    let reason = panic_message(join.into_panic());
                    error!(assert = true, tag = "supervisor", %role, %reason, "role task panicked");
                    Err(RelayError::TaskPanicked {
                        role: role.clone(),
                        reason,
                    })
                }
                Err(_) => Ok(RoleExit::Aborted),
            };
            (role, res)
        });
    }

    /// Следующая завершившаяся роль. `None`, когда ролей не осталось.
    pub async fn join_next(&mut self) -> Option<(String, RoleResult)> {
        loop {
            match self.set.join_next().await? {
                Ok(done) => return Some(done),
                // Снята сама обёртка; внутренняя задача остановится по токену.
                Err(_) => continue,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
