//! Capabilities the binding needs from a parameter panel.
//!
//! A panel holds titled sections; each section holds controls bound to a key.
//! When the user edits a control the panel calls every listener attached to
//! it, synchronously and on the rendering thread.
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::{ControlValue, TweakKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub u64);

/// Everything a panel needs to build one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlSpec {
    pub key: String,
    pub kind: TweakKind,
    pub initial: ControlValue,
    /// `min`, `max`, `step` and any other annotation attribute.
    pub params: Map<String, Value>,
}

impl ControlSpec {
    pub fn min(&self) -> Option<f64> {
        self.params.get("min").and_then(Value::as_f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.params.get("max").and_then(Value::as_f64)
    }

    pub fn step(&self) -> Option<f64> {
        self.params.get("step").and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub control: ControlId,
    pub key: String,
    pub value: ControlValue,
}

pub type ChangeListener = Box<dyn FnMut(&ChangeEvent)>;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("panel has been disposed")]
    Disposed,
    #[error("unknown section {0:?}")]
    UnknownSection(SectionId),
    #[error("unknown control {0:?}")]
    UnknownControl(ControlId),
    #[error("cannot bind '{key}': {reason}")]
    InvalidBinding { key: String, reason: String },
}

pub trait GuiPanel {
    fn add_section(&mut self, title: &str) -> Result<SectionId, PanelError>;

    fn add_control(&mut self, section: SectionId, spec: ControlSpec)
        -> Result<ControlId, PanelError>;

    fn on_change(&mut self, control: ControlId, listener: ChangeListener)
        -> Result<(), PanelError>;

    /// Removes one section and its controls; other sections stay live.
    fn dispose_section(&mut self, section: SectionId);

    /// Tears down the whole panel, including sections owned by other bindings.
    fn dispose(&mut self);
}
