use super::descriptor::DeviceEntry;
use tracing::trace;

/// Parse `v4l2-ctl --list-devices` output.
///
/// Each group starts with an unindented `Name (bus-info):` header followed by
/// indented device nodes. Groups whose header matches an ignore pattern are
/// hardware codecs and ISPs rather than cameras. Only the first `/dev/video*`
/// node of a group is the capture node; later ones are metadata streams.
pub fn parse_v4l2_devices(output: &str, ignore_patterns: &[String]) -> Vec<DeviceEntry> {
    let mut entries = Vec::new();
    let mut header: Option<&str> = None;
    let mut taken = false;

    for line in output.lines() {
        if line.trim().is_empty() {
            header = None;
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented {
            let trimmed = line.trim_end();
            header = trimmed.strip_suffix(':');
            taken = false;

            if let Some(h) = header {
                if ignore_patterns.iter().any(|p| h.contains(p.as_str())) {
                    trace!("Ignoring non-capture device group: {}", h);
                    taken = true;
                }
            }
            continue;
        }

        let Some(group) = header else { continue };
        let node = line.trim();
        if taken || !node.starts_with("/dev/video") {
            continue;
        }

        taken = true;
        entries.push(DeviceEntry {
            name: group_name(group),
            device: node.to_string(),
        });
    }

    entries
}

fn group_name(header: &str) -> Option<String> {
    let name = match header.find(" (") {
        Some(idx) => &header[..idx],
        None => header,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum DshowSection {
    Unknown,
    Video,
    Audio,
}

/// Parse the device listing ffmpeg prints for `-list_devices true -f dshow`.
///
/// Handles both the current `"Name" (video)` form and the older layout where
/// devices are listed under `DirectShow video devices` / `DirectShow audio devices`
/// section headers.
pub fn parse_dshow_devices(output: &str) -> Vec<DeviceEntry> {
    let mut entries = Vec::new();
    let mut section = DshowSection::Unknown;

    for line in output.lines() {
        let body = match line.find("] ") {
            Some(idx) if line.starts_with('[') => &line[idx + 2..],
            _ => line,
        };

        if body.contains("DirectShow video devices") {
            section = DshowSection::Video;
            continue;
        }
        if body.contains("DirectShow audio devices") {
            section = DshowSection::Audio;
            continue;
        }
        if body.contains("Alternative name") {
            continue;
        }

        let Some(start) = body.find('"') else { continue };
        let rest = &body[start + 1..];
        let Some(end) = rest.find('"') else { continue };
        let name = &rest[..end];
        let kind = rest[end + 1..].trim();

        let is_video = match kind {
            "" => section == DshowSection::Video,
            k => k.starts_with('(') && k.contains("video"),
        };

        if is_video && !name.is_empty() {
            entries.push(DeviceEntry {
                name: Some(name.to_string()),
                device: format!("video={}", name),
            });
        }
    }

    entries
}
