use std::{env, net::SocketAddr};

use atty::Stream;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;

/// Полный баннер с информацией о ретрансляторе.
pub const ASCII_FULL: &str = r#"
    zrelay {version}
    ----------------------------------------------
    Mode:             {mode}
    Publish:          {publish}
    Subscribe:        {subscribe}
    Subscribers:      {subscribers}
    PID:              {pid}
    OS/Arch:          {os}/{arch}
    Build:            {git} ({build_time})
"#;

/// Компактный баннер.
pub const ASCII_COMPACT: &str = r#"
zrelay {version} - {mode} - pub {publish} / sub {subscribe} - PID {pid}
"#;

/// Что показывать в баннере.
#[derive(Debug, Clone)]
pub struct BannerInfo<'a> {
    pub publish_addr: &'a str,
    pub subscribe_addr: &'a str,
    pub subscribers: usize,
}

/// Подставляет значения в шаблон баннера.
pub fn render_banner(
    info: &BannerInfo<'_>,
    full: bool,
) -> String {
    let bits = std::mem::size_of::<usize>() * 8;
    let version = format!("{} ({bits}-bit)", env!("CARGO_PKG_VERSION"));
    let mode = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let pid = std::process::id().to_string();

    if !full {
        return ASCII_COMPACT
            .replace("{version}", &version)
            .replace("{mode}", mode)
            .replace("{publish}", info.publish_addr)
            .replace("{subscribe}", info.subscribe_addr)
            .replace("{pid}", &pid);
    }

    let git = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    let build_time = match DateTime::parse_from_rfc3339(build_time_raw) {
        Ok(dt) => dt
            .with_timezone(&Local)
            .format("%d.%m.%Y %H:%M:%S")
            .to_string(),
        Err(_) => build_time_raw.to_string(),
    };

    ASCII_FULL
        .replace("{version}", &version)
        .replace("{mode}", mode)
        .replace("{publish}", info.publish_addr)
        .replace("{subscribe}", info.subscribe_addr)
        .replace("{subscribers}", &info.subscribers.to_string())
        .replace("{pid}", &pid)
        .replace("{os}", env::consts::OS)
        .replace("{arch}", env::consts::ARCH)
        .replace("{git}", git)
        .replace("{build_time}", &build_time)
}

/// Печатает баннер при старте.
///
/// `ZRELAY_BANNER=full|compact` переопределяет вид; по умолчанию debug-сборка
/// печатает полный баннер, release — компактный.
pub fn print_banner(info: &BannerInfo<'_>) {
    let full = match env::var("ZRELAY_BANNER").ok().as_deref() {
        Some("full") => true,
        Some("compact") => false,
        _ => cfg!(debug_assertions),
    };

    let s = render_banner(info, full);
    if !atty::is(Stream::Stdout) {
        println!("{s}");
        return;
    }

    for (i, line) in s.lines().enumerate() {
        let trimmed = line.trim_start();
        if i == 1 && full {
            println!("{}", line.bold().bright_blue());
        } else if !full && !trimmed.is_empty() {
            println!("{}", line.bold().green());
        } else if trimmed.starts_with("Publish:") || trimmed.starts_with("Subscribe:") {
            println!("{}", line.cyan());
        } else if trimmed.starts_with("Build:") {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
    println!();
}

/// Строка о готовности: форвардер открыл оба адреса.
pub fn print_ready_log(
    publish: SocketAddr,
    subscribe: SocketAddr,
) {
    let pid = std::process::id();
    let ts = Local::now().format("%d %b %Y %H:%M:%S%.3f");

    if atty::is(Stream::Stdout) {
        println!(
            "[{}] {} {}",
            pid.to_string().red(),
            ts.to_string().white(),
            format!("* Relaying {publish} -> {subscribe}").green()
        );
    } else {
        println!("[{pid}] {ts} * Relaying {publish} -> {subscribe}");
    }
}
