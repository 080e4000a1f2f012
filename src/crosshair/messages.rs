use crate::crosshair::settings::RenderSettings;

/// Commands delivered to the thread that owns the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    Toggle,
    Show,
    Hide,
    ApplySettings(RenderSettings),
    /// Re-read the settings file and apply it.
    ReloadSettings,
    Shutdown,
}

/// Single-letter commands accepted on the binary's stdin.
pub fn parse_command(line: &str) -> Option<HostMessage> {
    match line.trim().to_ascii_lowercase().as_str() {
        "t" | "toggle" => Some(HostMessage::Toggle),
        "s" | "show" => Some(HostMessage::Show),
        "h" | "hide" => Some(HostMessage::Hide),
        "r" | "reload" => Some(HostMessage::ReloadSettings),
        "q" | "quit" | "exit" => Some(HostMessage::Shutdown),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_command, HostMessage};

    #[test]
    fn commands_accept_short_and_long_forms() {
        assert_eq!(parse_command("t"), Some(HostMessage::Toggle));
        assert_eq!(parse_command(" Toggle \n"), Some(HostMessage::Toggle));
        assert_eq!(parse_command("s"), Some(HostMessage::Show));
        assert_eq!(parse_command("hide"), Some(HostMessage::Hide));
        assert_eq!(parse_command("r"), Some(HostMessage::ReloadSettings));
        assert_eq!(parse_command("quit"), Some(HostMessage::Shutdown));
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("launch"), None);
    }
}
