//! Panel selection by name
//!
//! The table is fixed at compile time. Names are matched exactly and
//! case-sensitively; should two entries ever share a name, the later one wins.
use super::{gdew042t2, gdew042z15, Panel};

type Constructor = fn() -> Box<dyn Panel>;

fn waveshare_042bw() -> Box<dyn Panel> {
    Box::new(gdew042t2::Gdew042t2::new())
}

fn waveshare_042bwr() -> Box<dyn Panel> {
    Box::new(gdew042z15::Gdew042z15::new())
}

static PANELS: &[(&str, Constructor)] = &[
    (gdew042t2::NAME, waveshare_042bw),
    (gdew042z15::NAME, waveshare_042bwr),
];

/// Fresh, uninitialized panel registered under `name`
pub fn create_panel(name: &str) -> Option<Box<dyn Panel>> {
    lookup(PANELS, name)
}

/// Names accepted by [`create_panel`], in registration order
pub fn supported_panels() -> Vec<&'static str> {
    PANELS.iter().map(|(name, _)| *name).collect()
}

fn lookup(table: &[(&str, Constructor)], name: &str) -> Option<Box<dyn Panel>> {
    let panel = table
        .iter()
        .rev()
        .find(|(registered, _)| *registered == name)
        .map(|(_, construct)| construct());
    if panel.is_none() {
        log::warn!("No panel registered as {:?}", name);
    }
    panel
}
