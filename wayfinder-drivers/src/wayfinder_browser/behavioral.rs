use anyhow::Result;
use fantoccini::elements::Element;
use rand::rngs::OsRng;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::sleep;

/// Sends text one character at a time with a random pause after each key.
#[derive(Debug, Clone)]
pub struct KeystrokePacer {
    pause_ms: RangeInclusive<u64>,
}

impl Default for KeystrokePacer {
    fn default() -> Self {
        Self::new(100, 300)
    }
}

impl KeystrokePacer {
    /// An inverted range collapses to `min_ms`.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            pause_ms: min_ms..=max_ms.max(min_ms),
        }
    }

    fn next_pause(&self) -> Duration {
        let (lo, hi) = (*self.pause_ms.start(), *self.pause_ms.end());
        let ms = if lo == hi { lo } else { OsRng.gen_range(lo..=hi) };
        Duration::from_millis(ms)
    }

    pub async fn type_into(&self, element: &Element, text: &str) -> Result<()> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            element.send_keys(ch.encode_utf8(&mut buf)).await?;
            sleep(self.next_pause()).await;
        }
        Ok(())
    }
}
