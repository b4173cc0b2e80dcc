use rand::rng;
use rand::seq::SliceRandom;

use rating_core::model::ImageId;

/// Decides which catalog images a session gets and in what order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageOrder {
    shuffle: bool,
}

impl ImageOrder {
    pub(crate) fn new(shuffle: bool) -> Self {
        Self { shuffle }
    }

    /// Order an explicit selection for display.
    pub(crate) fn arrange(self, mut ids: Vec<ImageId>) -> Vec<ImageId> {
        if self.shuffle {
            ids.shuffle(&mut rng());
        }
        ids
    }

    /// Pick up to `limit` images from the whole catalog, already in display order.
    pub(crate) fn sample(self, catalog: Vec<ImageId>, limit: usize) -> Vec<ImageId> {
        let mut picked = self.arrange(catalog);
        picked.truncate(limit);
        picked
    }
}
