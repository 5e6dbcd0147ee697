//! Shipped feed plugins and the default registry.

mod aws;
mod fastly;
mod gstatic;
mod linelist;
mod maxmind;

pub use aws::AwsFeed;
pub use fastly::FastlyFeed;
pub use gstatic::GstaticFeed;
pub use linelist::LineListFeed;
pub use maxmind::MaxmindAsnFeed;

use crate::config::FeedsConfig;
use crate::{FeedPlugin, Result};

/// Build the enabled plugin set from configuration.
///
/// Order here determines staging order only; the flattener is insensitive
/// to it.
pub fn default_plugins(config: &FeedsConfig) -> Result<Vec<Box<dyn FeedPlugin>>> {
    let mut plugins: Vec<Box<dyn FeedPlugin>> = Vec::new();

    if config.cloudflare.enabled {
        plugins.push(Box::new(LineListFeed::cloudflare(&config.cloudflare)?));
    }
    if config.spamhaus_drop.enabled {
        plugins.push(Box::new(LineListFeed::spamhaus_drop(&config.spamhaus_drop)?));
    }
    if config.aws.enabled {
        plugins.push(Box::new(AwsFeed::new(&config.aws)?));
    }
    if config.gcp.enabled {
        plugins.push(Box::new(GstaticFeed::gcp(&config.gcp)?));
    }
    if config.google.enabled {
        plugins.push(Box::new(GstaticFeed::google(&config.google)?));
    }
    if config.fastly.enabled {
        plugins.push(Box::new(FastlyFeed::new(&config.fastly)?));
    }
    if config.maxmind.enabled {
        plugins.push(Box::new(MaxmindAsnFeed::new(&config.maxmind)?));
    }

    Ok(plugins)
}
