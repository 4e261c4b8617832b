use std::time::Duration;

static ROTATING_MESSAGES: [&str; 6] = [
    "Warming up the creative circuits...",
    "Studying your product and prompt...",
    "Mixing digital paints and pixels...",
    "Consulting the muses of photography...",
    "Adjusting the virtual studio lights...",
    "Rendering the final shot...",
];

const ROTATION_SECONDS: u64 = 5;

/// Checked longest wait first.
static LONG_WAIT_MESSAGES: [(u64, &str); 2] = [
    (35, "Almost there, polishing the details..."),
    (25, "This is taking longer than usual, but good things take time!"),
];

pub fn progress_message(elapsed: Duration) -> &'static str {
    let seconds = elapsed.as_secs();
    if let Some((_, message)) = LONG_WAIT_MESSAGES
        .iter()
        .find(|(threshold, _)| seconds >= *threshold)
    {
        return *message;
    }
    let index = (seconds / ROTATION_SECONDS) as usize % ROTATING_MESSAGES.len();
    ROTATING_MESSAGES[index]
}

/// `mm:ss`; minutes keep growing past 99.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{format_elapsed, progress_message, ROTATING_MESSAGES};

    #[test]
    fn messages_rotate_every_five_seconds() {
        assert_eq!(progress_message(Duration::from_secs(0)), ROTATING_MESSAGES[0]);
        assert_eq!(progress_message(Duration::from_secs(4)), ROTATING_MESSAGES[0]);
        assert_eq!(progress_message(Duration::from_secs(5)), ROTATING_MESSAGES[1]);
        assert_eq!(progress_message(Duration::from_secs(24)), ROTATING_MESSAGES[4]);
    }

    #[test]
    fn long_waits_get_fixed_messages() {
        assert!(progress_message(Duration::from_secs(25)).starts_with("This is taking longer"));
        assert!(progress_message(Duration::from_secs(34)).starts_with("This is taking longer"));
        assert!(progress_message(Duration::from_secs(600)).starts_with("Almost there"));
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(75)), "01:15");
        assert_eq!(format_elapsed(Duration::from_millis(3_999)), "00:03");
    }
}
