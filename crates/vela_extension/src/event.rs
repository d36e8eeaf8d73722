//! Trigger event payloads
//!
//! The platform-neutral event value a resolved trigger handler receives.
//! Platform adapters translate their native input events into these before
//! dispatching through the resolver.

use std::sync::Arc;

/// Node identifier assigned by the host's tree
pub type NodeId = u64;

/// A dispatched trigger event
#[derive(Clone, Debug, PartialEq)]
pub struct TriggerEvent {
    /// The node the directive was declared on
    pub target: NodeId,
    pub data: TriggerData,
}

/// Event-specific data
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerData {
    Pointer { x: f32, y: f32, button: u8 },
    Key { code: u32, repeat: bool },
    Text { text: String },
    None,
}

impl TriggerEvent {
    pub fn pointer(target: NodeId, x: f32, y: f32, button: u8) -> Self {
        Self {
            target,
            data: TriggerData::Pointer { x, y, button },
        }
    }

    pub fn key(target: NodeId, code: u32, repeat: bool) -> Self {
        Self {
            target,
            data: TriggerData::Key { code, repeat },
        }
    }

    pub fn text(target: NodeId, text: impl Into<String>) -> Self {
        Self {
            target,
            data: TriggerData::Text { text: text.into() },
        }
    }

    pub fn bare(target: NodeId) -> Self {
        Self {
            target,
            data: TriggerData::None,
        }
    }
}

/// Trigger handler function type. Shared so one registration can serve
/// every composition built over the same registry.
pub type TriggerHandler = Arc<dyn Fn(&TriggerEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_fill_payloads() {
        assert_eq!(
            TriggerEvent::pointer(7, 1.5, 2.5, 0).data,
            TriggerData::Pointer {
                x: 1.5,
                y: 2.5,
                button: 0
            }
        );
        assert_eq!(
            TriggerEvent::key(7, 0x0D, false).data,
            TriggerData::Key {
                code: 0x0D,
                repeat: false
            }
        );
        assert_eq!(
            TriggerEvent::text(7, "é").data,
            TriggerData::Text {
                text: "é".to_string()
            }
        );
        assert_eq!(TriggerEvent::bare(7).data, TriggerData::None);
        assert_eq!(TriggerEvent::bare(7).target, 7);
    }
}
