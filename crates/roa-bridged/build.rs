//! Build script: render the roa-bridged(8) man page for packaging.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;

const EPOCH_DATE: &str = "1970-01-01";

/// Flags documented in the OPTIONS section, as `(flag, argument, summary)`.
const OPTIONS: &[(&str, &str, &str)] = &[
    ("--bird-socket", "PATH", "BIRD control socket to send ROA commands to."),
    ("--rtr-host", "HOST", "RPKI cache host name or address."),
    ("--rtr-port", "PORT", "RPKI cache port."),
    ("--rtr-bind-address", "ADDR", "Local address for the cache connection."),
    ("--roa-table", "NAME", "ROA table named in every command."),
    ("--ip-version", "4|6|46", "Address families forwarded to BIRD."),
    ("--daemon", "", "Detach and run in the background."),
    ("--pid-file", "PATH", "Lock file holding the background process id."),
    ("--quiet", "", "Log accepted commands at debug level only."),
    ("--log-filter", "FILTER", "tracing filter expression."),
    ("--log-format", "json|compact", "Log line format."),
    ("--log-file", "PATH", "Append logs to PATH instead of stderr."),
    ("--config-path", "PATH", "TOML configuration file."),
];

fn manual_date() -> String {
    let Some(raw) = env::var("SOURCE_DATE_EPOCH").ok() else {
        return EPOCH_DATE.to_owned();
    };
    raw.parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|date| date.format(&Iso8601::DATE).ok())
        .unwrap_or_else(|| {
            println!("cargo:warning=ignoring unusable SOURCE_DATE_EPOCH '{raw}'");
            EPOCH_DATE.to_owned()
        })
}

fn render(binary: &str, version: &str, date: &str) -> String {
    let mut page = format!(
        ".TH \"{title}\" \"8\" \"{date}\" \"{binary} {version}\" \"System Manager's Manual\"\n\
.SH NAME\n\
{binary} \\- feed RPKI route origin authorisations into BIRD\n\
.SH SYNOPSIS\n\
.B {binary}\n\
[\\fIOPTIONS\\fR]\n\
.SH DESCRIPTION\n\
{binary} keeps an RTR session to an RPKI cache and replays every validated\n\
prefix change as an \\fBadd roa\\fR or \\fBdelete roa\\fR command on the BIRD\n\
control socket, reconnecting to BIRD whenever it restarts. In the foreground,\n\
typing \\fBexit\\fR stops the bridge.\n\
.SH OPTIONS\n",
        title = binary.to_uppercase(),
    );
    for (flag, argument, summary) in OPTIONS {
        let _ = writeln!(page, ".TP\n.B {flag} \\fI{argument}\\fR\n{summary}");
    }
    page.push_str(
        ".SH ENVIRONMENT\n\
Every option may also be set as \\fBROA_BRIDGE_\\fR followed by the upper-case\n\
key, for example \\fBROA_BRIDGE_BIRD_SOCKET\\fR.\n",
    );
    page
}

/// Walks from `OUT_DIR` (`target/{profile}/build/{crate}-{hash}/out`) up to `target`.
fn target_dir() -> Option<PathBuf> {
    let out_dir = PathBuf::from(env::var_os("OUT_DIR")?);
    out_dir.ancestors().nth(4).map(Path::to_path_buf)
}

fn install(page: &str, dir: &Path, name: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let staging = dir.join(format!("{name}.tmp"));
    fs::write(&staging, page)?;
    fs::rename(&staging, dir.join(name))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for variable in ["CARGO_PKG_VERSION", "SOURCE_DATE_EPOCH", "TARGET", "PROFILE"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let binary = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "roa-bridged".to_owned());
    let version = env::var("CARGO_PKG_VERSION")?;
    let page = render(&binary, &version, &manual_date());
    let name = format!("{binary}.8");

    // Packagers pick pages up from target/generated-man/<target>/<profile>.
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_owned());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_owned());
    let man_dir = target_dir()
        .unwrap_or_else(|| PathBuf::from("target"))
        .join("generated-man")
        .join(target)
        .join(profile);
    install(&page, &man_dir, &name)?;

    if let Some(out_dir) = env::var_os("OUT_DIR") {
        if let Err(error) = install(&page, Path::new(&out_dir), &name) {
            println!("cargo:warning=failed to stage man page in OUT_DIR: {error}");
        }
    }
    Ok(())
}
