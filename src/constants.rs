pub const DIR_CONFIG_DRIVE: &str = "mnt/config";
pub const DIR_CONFIG_DRIVE_LATEST: &str = "openstack/latest";
pub const DIR_ETC_NETWORK_INTERFACES_D: &str = "/etc/network/interfaces.d";
pub const DIR_ETC_NETWORK_SCRIPTS: &str = "/etc/sysconfig/network-scripts";
pub const DIR_ROOT: &str = "/";
pub const DIR_ROOT_SSH: &str = "/root/.ssh";
pub const DIR_SYS_CLASS_NET: &str = "sys/class/net";

pub const FILE_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";
pub const FILE_ETC_HOSTNAME: &str = "/etc/hostname";
pub const FILE_ETC_HOSTS: &str = "/etc/hosts";
pub const FILE_ETC_NETWORK_INTERFACES: &str = "/etc/network/interfaces";
pub const FILE_ETC_OS_RELEASE: &str = "/etc/os-release";
pub const FILE_ETC_RESOLV_CONF: &str = "/etc/resolv.conf";
pub const FILE_LOCK: &str = "/tmp/configdrive-init.lock";
pub const FILE_LOG: &str = "/var/log/configdrive-init.log";
pub const FILE_META_DATA: &str = "meta_data.json";
pub const FILE_NETWORK_INFO: &str = "network_info.json";
pub const FILE_VENDOR_DATA: &str = "vendor_data.json";

pub const IFACE_LOOPBACK: &str = "lo";
