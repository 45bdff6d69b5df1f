use anyhow::Result;

use remind_core::{ids::DisplayId, payload::Extras};

use crate::platform::ShadeEntry;
use crate::store::{read_json, update_json, HostPaths};

/// User-facing view of the visible notifications.
#[derive(Debug, Clone)]
pub struct Shade {
    paths: HostPaths,
}

impl Shade {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths }
    }

    pub fn list(&self) -> Result<Vec<ShadeEntry>> {
        read_json(&self.paths.shade_file())
    }

    /// Activates the notification's resumption action and returns its
    /// extras. Auto-cancel notifications leave the shade.
    pub fn tap(&self, display_id: DisplayId) -> Result<Option<Extras>> {
        update_json(&self.paths.shade_file(), |shade: &mut Vec<ShadeEntry>| {
            let index = shade
                .iter()
                .position(|entry| entry.notification.display_id == display_id)?;
            let extras = shade[index].notification.resume.extras.clone();
            if shade[index].notification.auto_cancel {
                shade.remove(index);
            }
            Some(extras)
        })
    }
}
