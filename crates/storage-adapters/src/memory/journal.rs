use async_trait::async_trait;
use dashmap::DashMap;
use domains::{CascadeJournal, CascadeStep, Result, UserId};

/// Completed cascade steps per user, in completion order.
#[derive(Default)]
pub struct InMemoryCascadeJournal {
    entries: DashMap<UserId, Vec<CascadeStep>>,
}

impl InMemoryCascadeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CascadeJournal for InMemoryCascadeJournal {
    async fn load(&self, user: UserId) -> Result<Vec<CascadeStep>> {
        Ok(self
            .entries
            .get(&user)
            .map(|steps| steps.value().clone())
            .unwrap_or_default())
    }

    async fn mark_completed(&self, user: UserId, step: CascadeStep) -> Result<()> {
        let mut steps = self.entries.entry(user).or_default();
        if !steps.contains(&step) {
            steps.push(step);
        }
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<()> {
        self.entries.remove(&user);
        Ok(())
    }
}
