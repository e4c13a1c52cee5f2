//! Specifier resolution, as defined in
//! <https://www.freedesktop.org/software/systemd/man/systemd.unit.html#Specifiers>.
use std::env;

use nix::unistd::{Gid, Group, Uid, User};
use once_cell::sync::Lazy;
use os_release::OsRelease;
use snafu::OptionExt;

use crate::{
    error::{self, Error},
    escape::{unescape_non_path, unescape_path},
    template::{unit_type, UnitType},
};

/// Context needed when resolving specifiers: currently only the full unit name.
pub type SpecifierContext<'a> = (&'a str,);

static OS_RELEASE: Lazy<OsRelease> =
    Lazy::new(|| OsRelease::new().unwrap_or_else(|_| OsRelease::default()));

static UTS_NAME: Lazy<nix::sys::utsname::UtsName> =
    Lazy::new(|| nix::sys::utsname::uname().expect("Failed to read system information."));

static BOOT_ID: Lazy<String> = Lazy::new(|| {
    std::fs::read_to_string("/proc/sys/kernel/random/boot_id")
        .map(|x| x.trim().to_string())
        .unwrap_or_default()
});

static MACHINE_ID: Lazy<String> = Lazy::new(|| {
    std::fs::read_to_string("/etc/machine-id")
        .map(|x| x.trim().to_string())
        .unwrap_or_default()
});

static CURRENT_UID: Lazy<Uid> = Lazy::new(nix::unistd::getuid);
static CURRENT_GID: Lazy<Gid> = Lazy::new(nix::unistd::getgid);

fn current_user() -> Option<User> {
    User::from_uid(*CURRENT_UID).ok().flatten()
}

fn os_extra(key: &str) -> &str {
    OS_RELEASE.extra.get(key).map(|x| x.as_str()).unwrap_or("")
}

/// Resolves a specifier character and appends the result onto the given [String].
pub(crate) fn resolve(
    result: &mut String,
    specifier: char,
    context: SpecifierContext,
) -> Result<(), Error> {
    let in_system_mode = CURRENT_UID.is_root();
    match specifier {
        'a' => result.push_str(env::consts::ARCH),
        'A' => result.push_str(os_extra("IMAGE_VERSION")),
        'b' => result.push_str(BOOT_ID.as_str()),
        'B' => result.push_str(os_extra("BUILD_ID")),
        'C' => {
            if in_system_mode {
                result.push_str("/var/cache");
            } else if let Ok(path) = env::var("XDG_CACHE_HOME") {
                result.push_str(path.as_str());
            }
        }
        'd' => {
            if let Ok(path) = env::var("CREDENTIALS_DIRECTORY") {
                result.push_str(path.as_str());
            }
        }
        'E' => {
            if in_system_mode {
                result.push_str("/etc");
            } else if let Ok(path) = env::var("XDG_CONFIG_HOME") {
                result.push_str(path.as_str());
            }
        }
        'f' => match unit_type(context.0)? {
            UnitType::Instance { instance, .. } => {
                result.push_str(unescape_path(instance).as_str());
            }
            UnitType::Regular { name } => {
                result.push_str(unescape_path(prefix_of(name)).as_str());
            }
            UnitType::Template { prefix } => {
                result.push_str(unescape_path(prefix).as_str());
            }
        },
        'g' => {
            let group = Group::from_gid(*CURRENT_GID)
                .ok()
                .flatten()
                .context(error::NoGroupFoundSnafu)?;
            result.push_str(group.name.as_str());
        }
        'G' => result.push_str(CURRENT_GID.to_string().as_str()),
        'h' => {
            let user = current_user().context(error::NoUserFoundSnafu)?;
            result.push_str(user.dir.to_string_lossy().as_ref());
        }
        'H' => result.push_str(UTS_NAME.nodename().to_string_lossy().as_ref()),
        'i' => {
            if let UnitType::Instance { instance, .. } = unit_type(context.0)? {
                result.push_str(instance);
            }
        }
        'I' => {
            if let UnitType::Instance { instance, .. } = unit_type(context.0)? {
                result.push_str(unescape_non_path(instance).as_str());
            }
        }
        'j' => result.push_str(last_component(prefix_like(context.0)?)),
        'J' => result.push_str(unescape_non_path(last_component(prefix_like(context.0)?)).as_str()),
        'l' => {
            let nodename = UTS_NAME.nodename().to_string_lossy();
            let short = nodename.split('.').next().unwrap_or_default();
            result.push_str(short);
        }
        'L' => {
            if in_system_mode {
                result.push_str("/var/log");
            } else if let Ok(path) = env::var("XDG_STATE_HOME") {
                result.push_str(path.as_str());
                result.push_str("/log");
            }
        }
        'm' => result.push_str(MACHINE_ID.as_str()),
        'M' => result.push_str(os_extra("IMAGE_ID")),
        'n' => result.push_str(context.0),
        'N' => {
            let name = context.0.rsplit_once('.').map(|x| x.0).unwrap_or(context.0);
            result.push_str(name);
        }
        'o' => result.push_str(OS_RELEASE.id.as_str()),
        'p' => result.push_str(prefix_like(context.0)?),
        'P' => result.push_str(unescape_non_path(prefix_like(context.0)?).as_str()),
        'q' => result.push_str(OS_RELEASE.pretty_name.as_str()),
        's' => {
            let user = current_user().context(error::NoUserFoundSnafu)?;
            result.push_str(user.shell.to_string_lossy().as_ref());
        }
        'S' => {
            if in_system_mode {
                result.push_str("/var/lib");
            } else if let Ok(path) = env::var("XDG_STATE_HOME") {
                result.push_str(path.as_str());
            }
        }
        't' => {
            if in_system_mode {
                result.push_str("/run");
            } else if let Ok(path) = env::var("XDG_RUNTIME_DIR") {
                result.push_str(path.as_str());
            }
        }
        'T' => result.push_str("/tmp"),
        'u' => {
            let user = current_user().context(error::NoUserFoundSnafu)?;
            result.push_str(user.name.as_str());
        }
        'U' => result.push_str(CURRENT_UID.to_string().as_str()),
        'v' => result.push_str(UTS_NAME.release().to_string_lossy().as_ref()),
        'V' => result.push_str("/var/tmp"),
        'w' => result.push_str(OS_RELEASE.version_id.as_str()),
        'W' => result.push_str(os_extra("VARIANT_ID")),
        '%' => result.push('%'),
        _ => {
            return Err(Error::InvalidSpecifierError { specifier });
        }
    }
    Ok(())
}

/// The unit name prefix: everything before the "@" for instances and templates,
/// the name without its suffix otherwise.
fn prefix_like(name: &str) -> Result<&str, Error> {
    Ok(match unit_type(name)? {
        UnitType::Instance { prefix, .. } => prefix,
        UnitType::Template { prefix } => prefix,
        UnitType::Regular { name } => prefix_of(name),
    })
}

fn prefix_of(name: &str) -> &str {
    name.rsplit_once('.').map(|x| x.0).unwrap_or(name)
}

fn last_component(prefix: &str) -> &str {
    prefix.rsplit('-').next().unwrap_or(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(spec: char, unit_name: &str) -> String {
        let mut result = String::new();
        resolve(&mut result, spec, (unit_name,)).expect("specifier should resolve");
        result
    }

    #[test]
    fn test_name_specifiers() {
        assert_eq!(resolved('n', "foo-bar@inst.service"), "foo-bar@inst.service");
        assert_eq!(resolved('N', "foo-bar@inst.service"), "foo-bar@inst");
        assert_eq!(resolved('p', "foo-bar@inst.service"), "foo-bar");
        assert_eq!(resolved('p', "foo-bar.service"), "foo-bar");
        assert_eq!(resolved('i', "foo-bar@inst.service"), "inst");
        assert_eq!(resolved('i', "foo-bar.service"), "");
        assert_eq!(resolved('j', "foo-bar@inst.service"), "bar");
        assert_eq!(resolved('%', "foo.service"), "%");
    }

    #[test]
    fn test_unescaping_specifiers() {
        assert_eq!(resolved('I', "app@a-b.service"), "a/b");
        assert_eq!(resolved('f', "getty@var-run.service"), "/var/run");
        assert_eq!(resolved('f', "var-run.mount"), "/var/run");
    }

    #[test]
    fn test_unknown_specifier() {
        let mut result = String::new();
        assert!(resolve(&mut result, 'y', ("foo.service",)).is_err());
    }
}
