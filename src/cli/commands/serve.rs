//! Web server command.

use console::style;

use crate::config::Settings;

const DEFAULT_PORT: u16 = 5001;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    println!("{} Opening search log...", style("→").cyan());
    match settings.create_search_log() {
        Ok(log) => {
            println!(
                "  {} Database ready at {}",
                style("✓").green(),
                log.path().display()
            );
        }
        Err(e) => {
            eprintln!("  {} {:#}", style("✗").red(), e);
            return Err(e);
        }
    }

    println!(
        "{} Starting casefetch server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Searching {}", style(settings.search_url()).dim());
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "5001" -> 127.0.0.1:5001
/// - Just a host: "0.0.0.0" -> 0.0.0.0:5001
/// - Host and port: "0.0.0.0:5001" -> 0.0.0.0:5001
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Bind address is empty");
    }

    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(
            parse_bind_address("8080").unwrap(),
            ("127.0.0.1".to_string(), 8080)
        );
        assert_eq!(
            parse_bind_address("0.0.0.0").unwrap(),
            ("0.0.0.0".to_string(), DEFAULT_PORT)
        );
        assert_eq!(
            parse_bind_address("localhost:9000").unwrap(),
            ("localhost".to_string(), 9000)
        );
        assert!(parse_bind_address("  ").is_err());
    }
}
