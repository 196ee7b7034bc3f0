#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{Parser, Subcommand};
    use zakilo::config::Config;
    use zakilo::dom::HtmlPage;
    use zakilo::engine::{CardEngine, Trigger};
    use zakilo::{adapter, logging, registry, units};

    #[derive(Parser)]
    #[command(name = "zakilo")]
    #[command(about = "Unit price badges for grocery catalog pages", long_about = None)]
    struct Cli {
        /// Log every processing step
        #[arg(short, long, global = true)]
        verbose: bool,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Normalize a package size against its standard unit
        Convert {
            /// Package amount (e.g. 250)
            amount: f64,

            /// Unit token (г, гр, кг, мл, л, шт)
            unit: String,
        },

        /// Find the package size in a product name
        Extract {
            /// Free text, e.g. "Йогурт 6x45 г"
            text: String,
        },

        /// Badge every product card of a saved catalog page
        Annotate {
            /// Saved HTML page
            html: String,

            /// Built-in site adapter (see `zakilo sites`)
            #[arg(short, long)]
            site: Option<String>,

            /// Page URL, used to pick the site when --site is absent
            #[arg(long)]
            url: Option<String>,

            /// zakilo.toml with engine settings and selector overrides
            #[arg(short, long)]
            config: Option<String>,

            /// Annotated HTML output (default: stdout)
            #[arg(short, long)]
            output: Option<String>,
        },

        /// List built-in sites and the URLs they handle
        Sites,

        /// Show which site handles a URL
        Route {
            url: String,
        },
    }

    pub fn run() {
        let cli = Cli::parse();
        logging::init_cli(cli.verbose);

        let result = match cli.command {
            Commands::Convert { amount, unit } => convert(amount, &unit),
            Commands::Extract { text } => extract(&text),
            Commands::Annotate {
                html,
                site,
                url,
                config,
                output,
            } => annotate(&html, site.as_deref(), url.as_deref(), config.as_deref(), output.as_deref()),
            Commands::Sites => list_sites(),
            Commands::Route { url } => route(&url),
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    fn convert(amount: f64, unit: &str) -> Result<(), Box<dyn std::error::Error>> {
        let result = units::convert(amount, unit)?;
        match result.unit_label() {
            Some(label) => println!("{} {} -> {} (x{})", amount, unit, label, result.multiplier().unwrap_or(1.0)),
            None => println!("{} {} -> {}", amount, unit, units::NO_UNIT_INFO),
        }
        println!("\nJSON: {}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }

    fn extract(text: &str) -> Result<(), Box<dyn std::error::Error>> {
        let found = units::extract(text).ok_or_else(|| format!("No package size in '{}'", text))?;
        let result = units::convert(found.amount, &found.unit)?;

        println!("Amount: {}", found.amount);
        println!("Unit: {}", found.unit);
        if let Some(pack) = &found.pack {
            println!("Pack: {} x {}", pack.count, pack.each);
        }
        if let Some(label) = result.unit_label() {
            println!("Per {}: x{}", label, result.multiplier().unwrap_or(1.0));
        }
        Ok(())
    }

    fn annotate(
        path: &str,
        site: Option<&str>,
        url: Option<&str>,
        config_path: Option<&str>,
        output: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let config = match config_path {
            Some(p) => Config::load_from_file(p)?,
            None => Config::empty(),
        };

        let site = match (site, url) {
            (Some(site), _) => site.to_string(),
            (None, Some(url)) => registry::route(url)
                .ok_or_else(|| format!("No site handles {}", url))?
                .to_string(),
            (None, None) => return Err("Either --site or --url is required".into()),
        };
        let adapter = config.adapter(&site)?;

        let markup = std::fs::read_to_string(path)?;
        let mut page = HtmlPage::parse(&markup);
        let mut engine = CardEngine::new(adapter).with_max_attempts(config.engine.max_attempts);
        let report = engine.rescan(&mut page, Trigger::Init);

        if let Some(output_path) = output {
            std::fs::write(output_path, page.to_html())?;
            println!("Annotated page written to {}", output_path);
        } else {
            println!("{}", page.to_html());
        }

        eprintln!(
            "{}: {} cards, {} badged, {} skipped, {} failed",
            site, report.cards, report.rendered, report.skipped, report.failed
        );
        for error in &report.errors {
            eprintln!("  - {}", error);
        }
        if output.is_some() {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Ok(())
    }

    fn list_sites() -> Result<(), Box<dyn std::error::Error>> {
        let sites = adapter::sites::builtin();
        println!("Sites ({}):", sites.len());
        for site in &sites {
            let globs: Vec<&str> = registry::ROUTES
                .iter()
                .filter(|(_, name)| *name == site.name)
                .map(|(glob, _)| *glob)
                .collect();
            println!("  - {} ({}): {}", site.name, site.display_name, globs.join(", "));
        }
        Ok(())
    }

    fn route(url: &str) -> Result<(), Box<dyn std::error::Error>> {
        let site = registry::route(url).ok_or_else(|| format!("No site handles {}", url))?;
        println!("{}", site);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    cli::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {}
