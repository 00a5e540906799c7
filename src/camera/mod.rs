mod builder;
mod descriptor;
mod discovery;
mod parse;
mod probe;

pub use builder::CameraDiscoveryBuilder;
pub use descriptor::{stream_port, stream_url, CameraDescriptor, CameraSet, DeviceEntry};
pub use discovery::CameraDiscovery;
pub use parse::{parse_dshow_devices, parse_v4l2_devices};
pub use probe::{select_probe, CameraProbe, LinuxProbe, NullProbe, WindowsProbe};
