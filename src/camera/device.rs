//! Camera device normalization.

use std::collections::HashSet;

use super::types::{DeviceDescriptor, DeviceKind, RawDevice};

/// Turn a platform device listing into the session's device list.
///
/// Keeps only video inputs, in platform order. An empty id becomes
/// `camera-<index>`, where index is the position among the retained video
/// inputs. Ids in the result are unique: a repeated platform id keeps its
/// first entry, and a placeholder that collides with a real id gets a
/// numeric suffix.
pub fn normalize_devices(raw: Vec<RawDevice>) -> Vec<DeviceDescriptor> {
    let video: Vec<RawDevice> = raw
        .into_iter()
        .filter(|d| d.kind == DeviceKind::VideoInput)
        .collect();

    let reported: HashSet<String> = video
        .iter()
        .filter(|d| !d.device_id.is_empty())
        .map(|d| d.device_id.clone())
        .collect();

    let mut seen = HashSet::new();
    let mut devices = Vec::with_capacity(video.len());

    for (index, device) in video.into_iter().enumerate() {
        let device_id = if device.device_id.is_empty() {
            placeholder_id(index, &reported, &seen)
        } else {
            device.device_id
        };

        if !seen.insert(device_id.clone()) {
            log::debug!("Dropping duplicate camera entry '{}'", device_id);
            continue;
        }

        devices.push(DeviceDescriptor {
            device_id,
            label: device.label,
            kind: DeviceKind::VideoInput,
            group_id: device.group_id,
        });
    }

    devices
}

fn placeholder_id(index: usize, reported: &HashSet<String>, seen: &HashSet<String>) -> String {
    let base = format!("camera-{}", index);
    let taken = |id: &String| reported.contains(id) || seen.contains(id);
    if !taken(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(devices: &[DeviceDescriptor]) -> Vec<&str> {
        devices.iter().map(|d| d.device_id.as_str()).collect()
    }

    #[test]
    fn test_empty_ids_get_positional_placeholder() {
        let devices = normalize_devices(vec![RawDevice::video("", ""), RawDevice::video("abc", "")]);
        assert_eq!(ids(&devices), ["camera-0", "abc"]);
    }

    #[test]
    fn test_non_video_devices_are_filtered() {
        let raw = vec![
            RawDevice {
                device_id: "mic".to_string(),
                label: "Microphone".to_string(),
                kind: DeviceKind::AudioInput,
                group_id: None,
            },
            RawDevice::video("", "Rear"),
            RawDevice {
                device_id: "spk".to_string(),
                label: "Speakers".to_string(),
                kind: DeviceKind::AudioOutput,
                group_id: None,
            },
            RawDevice::video("", "Front"),
        ];
        let devices = normalize_devices(raw);
        // indices count only retained video inputs
        assert_eq!(ids(&devices), ["camera-0", "camera-1"]);
        assert_eq!(devices[1].label, "Front");
    }

    #[test]
    fn test_placeholder_collision_is_suffixed() {
        let devices =
            normalize_devices(vec![RawDevice::video("", ""), RawDevice::video("camera-0", "")]);
        assert_eq!(ids(&devices), ["camera-0-2", "camera-0"]);
    }

    #[test]
    fn test_duplicate_platform_ids_keep_first() {
        let devices = normalize_devices(vec![
            RawDevice::video("abc", "first"),
            RawDevice::video("abc", "second"),
        ]);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].label, "first");
    }

    #[test]
    fn test_empty_listing() {
        assert!(normalize_devices(Vec::new()).is_empty());
    }
}
