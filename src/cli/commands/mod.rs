use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("xivo-auth")
        .about("Authentication and token-issuance daemon")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9497")
                .env("XIVO_AUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("consul-url")
                .long("consul-url")
                .help("Consul agent URL, example: http://127.0.0.1:8500")
                .default_value("http://127.0.0.1:8500")
                .env("XIVO_AUTH_CONSUL_URL"),
        )
        .arg(
            Arg::new("consul-token")
                .long("consul-token")
                .help("Consul ACL token")
                .env("XIVO_AUTH_CONSUL_TOKEN"),
        )
        .arg(
            Arg::new("consul-timeout")
                .long("consul-timeout")
                .help("Consul request timeout in seconds")
                .default_value("4")
                .env("XIVO_AUTH_CONSUL_TIMEOUT")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("token-lifetime")
                .long("token-lifetime")
                .help("Default token lifetime in seconds")
                .default_value("7200")
                .env("XIVO_AUTH_TOKEN_LIFETIME")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("backends")
                .short('b')
                .long("backends")
                .help("Enabled authentication backends: mock, xivo_user, ldap_user, xivo_ws")
                .default_value("mock")
                .value_delimiter(',')
                .env("XIVO_AUTH_BACKENDS"),
        )
        .arg(
            Arg::new("xivo-uuid")
                .long("xivo-uuid")
                .help("Installation UUID stamped on every issued token")
                .env("XIVO_UUID"),
        )
        .arg(
            Arg::new("db-dsn")
                .short('d')
                .long("db-dsn")
                .help("Database connection string for the xivo_user backend")
                .env("XIVO_AUTH_DB_DSN"),
        )
        .arg(
            Arg::new("ldap-uri")
                .long("ldap-uri")
                .help("LDAP server URI for the ldap_user backend, example: ldap://directory.example.com:389")
                .env("XIVO_AUTH_LDAP_URI"),
        )
        .arg(
            Arg::new("ldap-user-base-dn")
                .long("ldap-user-base-dn")
                .help("Base DN users bind under, example: ou=people,dc=example,dc=com")
                .env("XIVO_AUTH_LDAP_USER_BASE_DN"),
        )
        .arg(
            Arg::new("ws-url")
                .long("ws-url")
                .help("Credential service URL for the xivo_ws backend")
                .env("XIVO_AUTH_WS_URL"),
        )
        .arg(
            Arg::new("cors")
                .long("cors")
                .help("Allow cross-origin requests")
                .action(ArgAction::SetTrue)
                .env("XIVO_AUTH_CORS"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("XIVO_AUTH_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "xivo-auth");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Authentication and token-issuance daemon"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("XIVO_AUTH_PORT", None::<&str>),
                ("XIVO_AUTH_CONSUL_URL", None),
                ("XIVO_AUTH_BACKENDS", None),
            ],
            || {
                let matches = new().get_matches_from(vec!["xivo-auth"]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(9497));
                assert_eq!(
                    matches.get_one::<String>("consul-url").map(String::as_str),
                    Some("http://127.0.0.1:8500")
                );
                assert_eq!(matches.get_one::<u64>("consul-timeout").copied(), Some(4));
                assert_eq!(
                    matches.get_one::<u64>("token-lifetime").copied(),
                    Some(7200)
                );
                let backends: Vec<&String> =
                    matches.get_many::<String>("backends").unwrap().collect();
                assert_eq!(backends, vec!["mock"]);
                assert!(!matches.get_flag("cors"));
            },
        );
    }

    #[test]
    fn test_backends_are_comma_separated() {
        let matches = new().get_matches_from(vec!["xivo-auth", "--backends", "mock,xivo_user"]);

        let backends: Vec<&str> = matches
            .get_many::<String>("backends")
            .unwrap()
            .map(String::as_str)
            .collect();
        assert_eq!(backends, vec!["mock", "xivo_user"]);
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("XIVO_AUTH_PORT", Some("443")),
                ("XIVO_AUTH_CONSUL_URL", Some("https://consul.tld:8501")),
                ("XIVO_AUTH_CONSUL_TOKEN", Some("sekret")),
                ("XIVO_AUTH_BACKENDS", Some("mock,ldap_user")),
                ("XIVO_AUTH_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["xivo-auth"]);

                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("consul-url").map(String::as_str),
                    Some("https://consul.tld:8501")
                );
                assert_eq!(
                    matches
                        .get_one::<String>("consul-token")
                        .map(String::as_str),
                    Some("sekret")
                );
                let backends: Vec<&str> = matches
                    .get_many::<String>("backends")
                    .unwrap()
                    .map(String::as_str)
                    .collect();
                assert_eq!(backends, vec!["mock", "ldap_user"]);
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("XIVO_AUTH_LOG_LEVEL", Some(level))], || {
                let matches = new().get_matches_from(vec!["xivo-auth"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("XIVO_AUTH_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["xivo-auth".to_string()];

                if index > 0 {
                    let v = format!("-{}", "v".repeat(index));
                    args.push(v);
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }
}
