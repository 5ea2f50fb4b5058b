/// The single managed chat channel. Volatile, recreated each session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub name: String,
    /// Display color (`rrggbb`) applied once the channel is registered.
    pub color: String,
    /// Assigned by the host when joined; `None` means not joined.
    pub server_index: Option<u32>,
}

impl ChannelState {
    pub fn new(name: String, color: String) -> Self {
        Self {
            name,
            color,
            server_index: None,
        }
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.server_index, Some(idx) if idx > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_channel_not_joined() {
        let ch = ChannelState::new("KnightGuard".into(), "ff8040".into());
        assert!(!ch.is_joined());
    }

    #[test]
    fn test_zero_index_means_not_joined() {
        let mut ch = ChannelState::new("KnightGuard".into(), "ff8040".into());
        ch.server_index = Some(0);
        assert!(!ch.is_joined());
        ch.server_index = Some(6);
        assert!(ch.is_joined());
    }
}
