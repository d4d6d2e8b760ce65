//! Channel name utilities.

/// Extension trait for checking if a string looks like a channel name.
pub trait ChannelExt {
    /// True if this string starts with the `#` channel prefix and contains
    /// no space, comma, BEL or NUL.
    fn is_channel_name(&self) -> bool;
}

impl ChannelExt for &str {
    fn is_channel_name(&self) -> bool {
        let Some(rest) = self.strip_prefix('#') else {
            return false;
        };
        !rest.contains([' ', ',', '\x07', '\0'])
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }
}
