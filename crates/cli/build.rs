use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("legible")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract the readable article from an HTML document")
        .arg(clap::arg!(<INPUT> "HTML file, or '-' for stdin"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (json, html, text)")
                .value_name("FORMAT")
                .default_value("json")
                .value_parser(["json", "html", "text"]),
        )
        .arg(clap::arg!(--"base-url" <URL> "Base URL used to resolve relative links").value_name("URL"))
        .arg(clap::arg!(--"char-threshold" <NUM> "Minimum character count of an accepted article").default_value("500"))
        .arg(clap::arg!(--"nb-top-candidates" <NUM> "Number of top candidates to track").default_value("5"))
        .arg(clap::arg!(--"max-elems" <NUM> "Maximum number of elements to parse (0 = unlimited)").default_value("0"))
        .arg(clap::arg!(--"keep-classes" "Keep class attributes in the output"))
        .arg(clap::arg!(--"disable-json-ld" "Ignore JSON-LD metadata"))
        .arg(clap::arg!(--sanitize "Strip scripts, event handlers and javascript: URLs before parsing"))
        .arg(clap::arg!(--check "Only check whether the document is worth extracting"))
        .arg(clap::arg!(-v --verbose "Print progress and debug logging to stderr"))
        .arg(
            clap::arg!(--completions <SHELL> "Print a shell completion script and exit")
                .value_name("SHELL")
                .value_parser(["bash", "elvish", "fish", "powershell", "zsh"]),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "legible", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "legible", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "legible", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "legible", &completions_dir).unwrap();

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
