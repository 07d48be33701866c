//! Discovery of hardware network devices under `/sys/class/net`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{debug, error, info};
use rustix::io::Errno;

use crate::constants::{DIR_SYS_CLASS_NET, IFACE_LOOPBACK};
use crate::fs::JoinRelative;

/// Live hardware devices keyed by lower-cased hardware address.
pub type DeviceMap = BTreeMap<String, String>;

/// Fixed-interval polling limits for waiting on carrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 50,
        }
    }
}

pub trait Clock {
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Administrative control of network links.
pub trait LinkControl {
    fn set_up(&self, name: &str) -> Result<()>;
}

/// Where the `carrier` attribute of a device is read from.
pub trait CarrierSource {
    fn read_carrier(&self, path: &Path) -> io::Result<String>;
}

pub struct SysfsCarrier;

impl CarrierSource for SysfsCarrier {
    fn read_carrier(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Refuses every change, for runs that must leave links alone.
pub struct NoLinkChanges;

impl LinkControl for NoLinkChanges {
    fn set_up(&self, name: &str) -> Result<()> {
        Err(anyhow!("not bringing up {} in dry-run mode", name))
    }
}

pub struct DeviceProber<'a> {
    sys_net: PathBuf,
    dry_run: bool,
    policy: RetryPolicy,
    links: &'a dyn LinkControl,
    clock: &'a dyn Clock,
    carrier: &'a dyn CarrierSource,
}

impl<'a> DeviceProber<'a> {
    pub fn new<P: AsRef<Path>>(
        root: P,
        dry_run: bool,
        links: &'a dyn LinkControl,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            sys_net: root.as_ref().join_relative(DIR_SYS_CLASS_NET),
            dry_run,
            policy: RetryPolicy::default(),
            links,
            clock,
            carrier: &SysfsCarrier,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_carrier_source(mut self, carrier: &'a dyn CarrierSource) -> Self {
        self.carrier = carrier;
        self
    }

    /// Map hardware addresses to names for every live, hardware-addressed
    /// device. When `only` is set, just that device is considered.
    pub fn probe(&self, only: Option<&str>) -> Result<DeviceMap> {
        let names = match only {
            Some(name) => vec![name.to_string()],
            None => self.list_devices()?,
        };
        debug!("Candidate devices are: {:?}", names);

        let mut devices = DeviceMap::new();
        for name in names {
            let assign_type = self.read_attr(&name, "addr_assign_type")?;
            if assign_type != "0" {
                debug!(
                    "Address of {} has assignment type {}, skipping",
                    name, assign_type
                );
                continue;
            }
            let mac = self.read_attr(&name, "address")?.to_lowercase();
            if self.bring_live(&name)? {
                debug!("Interface {} is live, adding", name);
                devices.insert(mac, name);
            }
        }
        debug!("Final devices are: {:?}", devices);
        Ok(devices)
    }

    fn list_devices(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.sys_net)
            .map_err(|e| anyhow!("unable to list {:?}: {}", self.sys_net, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| anyhow!("unable to list {:?}: {}", self.sys_net, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != IFACE_LOOPBACK {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_attr(&self, name: &str, attr: &str) -> Result<String> {
        let path = self.sys_net.join(name).join(attr);
        fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|e| anyhow!("unable to read {:?}: {}", path, e))
    }

    fn is_live(&self, name: &str) -> Result<bool> {
        let path = self.sys_net.join(name).join("carrier");
        match self.carrier.read_carrier(&path) {
            Ok(s) => Ok(s.trim() == "1"),
            // The kernel refuses to report carrier for a link that is down.
            Err(e) if is_link_not_ready(&e) => Ok(false),
            Err(e) => {
                error!("Unable to check carrier of {}: {}", name, e);
                Err(anyhow!("unable to read {:?}: {}", path, e))
            }
        }
    }

    fn bring_live(&self, name: &str) -> Result<bool> {
        if self.is_live(name)? {
            return Ok(true);
        }
        if self.dry_run {
            return Ok(false);
        }

        info!("Bringing up {}", name);
        self.links.set_up(name)?;

        for _ in 0..self.policy.max_attempts {
            if self.is_live(name)? {
                return Ok(true);
            }
            self.clock.sleep(self.policy.interval);
        }
        error!("Interface {} is not live, skipping", name);
        Ok(false)
    }
}

fn is_link_not_ready(e: &io::Error) -> bool {
    e.raw_os_error() == Some(Errno::INVAL.raw_os_error())
}

#[cfg(test)]
pub(crate) mod test {
    use std::cell::{Cell, RefCell};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    pub(crate) struct FakeSys {
        pub(crate) root: TempDir,
    }

    impl FakeSys {
        pub(crate) fn new() -> Self {
            let root = TempDir::new().unwrap();
            fs::create_dir_all(root.path().join(DIR_SYS_CLASS_NET)).unwrap();
            Self { root }
        }

        pub(crate) fn device(&self, name: &str, assign_type: &str, mac: &str, carrier: &str) {
            let dir = self.root.path().join(DIR_SYS_CLASS_NET).join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("addr_assign_type"), format!("{}\n", assign_type)).unwrap();
            fs::write(dir.join("address"), format!("{}\n", mac)).unwrap();
            self.set_carrier(name, carrier);
        }

        pub(crate) fn set_carrier(&self, name: &str, carrier: &str) {
            let path = self
                .root
                .path()
                .join(DIR_SYS_CLASS_NET)
                .join(name)
                .join("carrier");
            fs::write(path, format!("{}\n", carrier)).unwrap();
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeLinks {
        pub(crate) raised: RefCell<Vec<String>>,
    }

    impl LinkControl for FakeLinks {
        fn set_up(&self, name: &str) -> Result<()> {
            self.raised.borrow_mut().push(name.to_string());
            Ok(())
        }
    }

    /// Flips carrier to live for a device after a number of sleeps.
    struct FakeClock<'a> {
        sys: &'a FakeSys,
        live_after: Option<(&'a str, u32)>,
        sleeps: Cell<u32>,
    }

    impl<'a> FakeClock<'a> {
        fn new(sys: &'a FakeSys) -> Self {
            Self {
                sys,
                live_after: None,
                sleeps: Cell::new(0),
            }
        }
    }

    impl Clock for FakeClock<'_> {
        fn sleep(&self, duration: Duration) {
            assert_eq!(duration, RetryPolicy::default().interval);
            self.sleeps.set(self.sleeps.get() + 1);
            if let Some((name, n)) = self.live_after
                && self.sleeps.get() == n
            {
                self.sys.set_carrier(name, "1");
            }
        }
    }

    #[test]
    fn test_live_hardware_devices_are_mapped() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        sys.device("eth1", "0", "AA:BB:CC:DD:EE:FF", "1");
        sys.device("lo", "0", "00:00:00:00:00:00", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock);

        let devices = prober.probe(None).unwrap();
        assert_eq!(
            devices,
            DeviceMap::from([
                ("52:54:00:11:22:33".to_string(), "eth0".to_string()),
                ("aa:bb:cc:dd:ee:ff".to_string(), "eth1".to_string()),
            ])
        );
        assert!(links.raised.borrow().is_empty());
    }

    #[test]
    fn test_random_addresses_are_excluded() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        sys.device("veth0", "1", "de:ad:be:ef:00:01", "1");
        sys.device("dummy0", "3", "de:ad:be:ef:00:02", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock);

        let devices = prober.probe(None).unwrap();
        assert_eq!(devices.values().collect::<Vec<_>>(), vec!["eth0"]);
    }

    #[test]
    fn test_single_interface_filter() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        sys.device("eth1", "0", "52:54:00:11:22:34", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock);

        let devices = prober.probe(Some("eth1")).unwrap();
        assert_eq!(devices.values().collect::<Vec<_>>(), vec!["eth1"]);
    }

    #[test]
    fn test_down_device_is_raised_and_polled() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "0");
        let links = FakeLinks::default();
        let mut clock = FakeClock::new(&sys);
        clock.live_after = Some(("eth0", 3));
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock);

        let devices = prober.probe(None).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(*links.raised.borrow(), vec!["eth0".to_string()]);
        assert_eq!(clock.sleeps.get(), 3);
    }

    #[test]
    fn test_device_never_live_is_excluded() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "0");
        sys.device("eth1", "0", "52:54:00:11:22:34", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock);

        let devices = prober.probe(None).unwrap();
        assert_eq!(devices.values().collect::<Vec<_>>(), vec!["eth1"]);
        assert_eq!(clock.sleeps.get(), RetryPolicy::default().max_attempts);
    }

    #[test]
    fn test_custom_policy_bounds_attempts() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "0");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let policy = RetryPolicy {
            max_attempts: 5,
            ..RetryPolicy::default()
        };
        let prober =
            DeviceProber::new(sys.root.path(), false, &links, &clock).with_policy(policy);

        assert!(prober.probe(None).unwrap().is_empty());
        assert_eq!(clock.sleeps.get(), 5);
    }

    #[test]
    fn test_dry_run_does_not_raise_links() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "0");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), true, &links, &clock);

        assert!(prober.probe(None).unwrap().is_empty());
        assert!(links.raised.borrow().is_empty());
        assert_eq!(clock.sleeps.get(), 0);
    }

    #[test]
    fn test_unreadable_carrier_is_fatal() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        let carrier = sys
            .root
            .path()
            .join(DIR_SYS_CLASS_NET)
            .join("eth0/carrier");
        fs::remove_file(&carrier).unwrap();
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), true, &links, &clock);

        assert!(prober.probe(None).is_err());
    }

    #[test]
    fn test_missing_device_is_fatal() {
        let sys = FakeSys::new();
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let prober = DeviceProber::new(sys.root.path(), true, &links, &clock);

        assert!(prober.probe(Some("eth9")).is_err());
    }

    /// Fails carrier reads with EINVAL a number of times before reading
    /// the fake sysfs.
    struct NotReadyCarrier {
        failures: Cell<u32>,
    }

    impl CarrierSource for NotReadyCarrier {
        fn read_carrier(&self, path: &Path) -> io::Result<String> {
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(io::Error::from_raw_os_error(Errno::INVAL.raw_os_error()));
            }
            fs::read_to_string(path)
        }
    }

    #[test]
    fn test_link_not_ready_is_not_live() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let carrier = NotReadyCarrier {
            failures: Cell::new(u32::MAX),
        };
        let prober = DeviceProber::new(sys.root.path(), true, &links, &clock)
            .with_carrier_source(&carrier);

        assert!(prober.probe(None).unwrap().is_empty());
        assert!(links.raised.borrow().is_empty());
    }

    #[test]
    fn test_link_not_ready_is_raised_until_live() {
        let sys = FakeSys::new();
        sys.device("eth0", "0", "52:54:00:11:22:33", "1");
        let links = FakeLinks::default();
        let clock = FakeClock::new(&sys);
        let carrier = NotReadyCarrier {
            failures: Cell::new(2),
        };
        let prober = DeviceProber::new(sys.root.path(), false, &links, &clock)
            .with_carrier_source(&carrier);

        let devices = prober.probe(None).unwrap();
        assert_eq!(devices.values().collect::<Vec<_>>(), vec!["eth0"]);
        assert_eq!(*links.raised.borrow(), vec!["eth0".to_string()]);
        assert_eq!(clock.sleeps.get(), 1);
    }

    #[test]
    fn test_no_link_changes_refuses() {
        assert!(NoLinkChanges.set_up("eth0").is_err());
    }

    #[test]
    fn test_link_not_ready_detection() {
        let einval = io::Error::from_raw_os_error(Errno::INVAL.raw_os_error());
        let eacces = io::Error::from_raw_os_error(Errno::ACCESS.raw_os_error());
        assert!(is_link_not_ready(&einval));
        assert!(!is_link_not_ready(&eacces));
    }
}
