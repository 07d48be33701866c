use std::io::{self, Write};

use anyhow::Result;
use log::{debug, info, warn};

use crate::config::Config;
use crate::distro::Distro;
use crate::hostname::set_hostname;
use crate::interfaces::interfaces_from;
use crate::keys::write_ssh_keys;
use crate::lock::RunLock;
use crate::metadata::{ConfigDrive, dns_servers};
use crate::network::NetlinkLinks;
use crate::probe::{Clock, DeviceProber, LinkControl, NoLinkChanges, SystemClock};
use crate::render::render_resolv_conf;
use crate::writer::Writer;

/// Run every requested action while holding the run lock.
pub fn initialize(config: &Config) -> Result<()> {
    let _lock = RunLock::acquire(&config.lock_file)?;
    debug!("Config: {:?}", config);

    let drive = ConfigDrive::new(&config.root);
    let writer = Writer::new(&config.target_root, config.dry_run);
    let mut stdout = io::stdout().lock();

    if config.ssh {
        write_ssh_keys(
            &drive,
            &config.target_root,
            &writer,
            config.dry_run,
            &mut stdout,
        )?;
    }
    if config.hostname {
        set_hostname(&drive, &config.target_root, config.dry_run)?;
    }
    if config.wants_network() {
        if config.dry_run {
            configure_network(
                config,
                &drive,
                &writer,
                &NoLinkChanges,
                &SystemClock,
                &mut stdout,
            )?;
        } else {
            let links = NetlinkLinks::new()?;
            configure_network(config, &drive, &writer, &links, &SystemClock, &mut stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

/// Render and write resolver and interface configuration from the config
/// drive for the devices present on this machine.
pub fn configure_network(
    config: &Config,
    drive: &ConfigDrive,
    writer: &Writer,
    links: &dyn LinkControl,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<()> {
    let info = drive.network_info()?;
    let mut files = render_resolv_conf(&dns_servers(&info));
    let interfaces = interfaces_from(&info);
    let devices = DeviceProber::new(&config.root, config.dry_run, links, clock)
        .probe(config.interface.as_deref())?;

    let Some(distro) = Distro::detect(&config.target_root, config.distro.as_deref())? else {
        warn!("Distribution not supported, not writing network configuration");
        return Ok(());
    };
    info!(
        "Configuring {} interface(s) for {:?} from {} record(s)",
        devices.len(),
        distro,
        interfaces.len()
    );
    files.extend(distro.renderer(&config.target_root).render(&interfaces, &devices));
    writer.finish(&files, out)
}
