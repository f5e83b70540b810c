use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{FuzzySelect, Input, Select};
use imgascii::{AppConfig, AsciiArt, AsciiConverter, ConversionOptions, Fetcher};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

fn load_config() -> Result<AppConfig> {
    // Look for imgascii.json in app support, current dir fallback, then built-in default
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("imgascii");
        d.push("imgascii.json");
        tried.push(d);
    }
    tried.push(PathBuf::from("imgascii.json"));

    for p in &tried {
        if p.exists() {
            log::debug!("using config {}", p.display());
            return AppConfig::from_file(p);
        }
    }

    Ok(AppConfig::default())
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a local image file
    File {
        /// Image to convert
        path: PathBuf,
        /// Output text file (defaults to <image stem>.txt)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download and convert every image on a web page
    Site {
        /// Page to scrape for <img> tags
        url: String,
        /// Directory for the image<N>.txt files
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Download and convert a generated random face
    Face,
}

#[derive(Parser, Debug)]
#[command(version, about = "Convert images, web page images and random faces to ASCII art.")]
struct Args {
    /// Run one conversion; without a subcommand an interactive menu is shown
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Target columns (width); overrides the preset
    #[arg(long, global = true)]
    columns: Option<u32>,

    /// Width preset from the config file
    #[arg(long, global = true)]
    preset: Option<String>,

    /// Directory for downloaded images
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Do not echo the art to the terminal
    #[arg(long, short, global = true, default_value_t = false)]
    quiet: bool,

    /// Hide download progress bars
    #[arg(long, global = true, default_value_t = false)]
    no_progress: bool,

    /// Log pipeline details to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

struct App {
    converter: AsciiConverter,
    fetcher: Fetcher,
    download_dir: PathBuf,
    columns: Option<u32>,
    preset: Option<String>,
    echo: bool,
}

impl App {
    fn options(&self, face: bool) -> Result<ConversionOptions> {
        let mut opts = match (&self.preset, face) {
            (Some(name), _) => self.converter.options_from_preset(name)?,
            (None, true) => self.converter.face_options()?,
            (None, false) => self.converter.default_options()?,
        };
        if let Some(columns) = self.columns {
            if columns == 0 {
                return Err(anyhow!("--columns must be greater than zero"));
            }
            opts = opts.with_columns(columns);
        }
        Ok(opts)
    }

    fn emit(&self, art: &AsciiArt) -> Result<()> {
        if self.echo {
            art.echo(&mut io::stdout().lock()).context("writing to stdout")?;
        }
        Ok(())
    }

    fn convert_file(&self, path: &Path, out: Option<PathBuf>) -> Result<()> {
        let out = out.unwrap_or_else(|| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("imgascii_output");
            PathBuf::from(format!("{}.txt", stem))
        });
        let art = self.converter.convert_image(path, &out, &self.options(false)?)?;
        self.emit(&art)?;
        println!("ASCII art saved to {}", out.display());
        Ok(())
    }

    fn convert_site(&self, url: &str, out_dir: Option<PathBuf>) -> Result<()> {
        let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("."));
        let opts = self.options(false)?;
        let images = self
            .converter
            .convert_site(&self.fetcher, url, &self.download_dir, &out_dir, &opts)?;
        if images.is_empty() {
            println!("No images found on {}", url);
            return Ok(());
        }

        let mut written = 0usize;
        for image in &images {
            match &image.outcome {
                Ok(art) => {
                    self.emit(art)?;
                    written += 1;
                }
                Err(e) => eprintln!("Warning: skipping image {} ({}): {:#}", image.index, image.url, e),
            }
        }
        println!("Converted {} of {} image(s) into {}", written, images.len(), out_dir.display());
        Ok(())
    }

    fn convert_face(&self) -> Result<()> {
        let url = &self.converter.config().random_face_url;
        let image_path = self.fetcher.random_face(url, &self.download_dir)?;
        let out = image_path.with_extension("txt");
        let art = self.converter.convert_image(&image_path, &out, &self.options(true)?)?;
        self.emit(&art)?;
        println!("ASCII art saved to {}", out.display());
        Ok(())
    }

    fn run(&self, cmd: Command) -> Result<()> {
        match cmd {
            Command::File { path, out } => self.convert_file(&path, out),
            Command::Site { url, out_dir } => self.convert_site(&url, out_dir),
            Command::Face => self.convert_face(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = load_config()?;
    if let Some(dir) = args.download_dir.clone() {
        cfg.download_dir = Some(dir);
    }

    let fetcher = Fetcher::new(&cfg.user_agent)?.with_progress(!args.no_progress);
    let app = App {
        download_dir: cfg.download_dir(),
        converter: AsciiConverter::with_config(cfg)?,
        fetcher,
        columns: args.columns,
        preset: args.preset.clone(),
        echo: !args.quiet,
    };

    match args.cmd {
        Some(cmd) => app.run(cmd),
        None => run_menu(&app),
    }
}

fn run_menu(app: &App) -> Result<()> {
    println!("This program will convert image to ASCII characters");
    println!("---------------------------------------------------");

    let choices = [
        "Enter image manually",
        "All images from website",
        "Image from \"thispersondoesnotexist.com\"",
        "Exit",
    ];
    loop {
        let sel = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choice")
            .default(0)
            .items(&choices)
            .interact()?;

        let cmd = match sel {
            0 => Command::File {
                path: prompt_image_path()?,
                out: None,
            },
            1 => {
                let url: String = Input::new().with_prompt("Enter URL").interact_text()?;
                Command::Site { url, out_dir: None }
            }
            2 => Command::Face,
            _ => return Ok(()),
        };

        if let Err(e) = app.run(cmd) {
            eprintln!("Error: {:#}", e);
        }
    }
}

fn prompt_image_path() -> Result<PathBuf> {
    let mut items = find_image_files();
    if items.is_empty() {
        return prompt_typed_path();
    }
    items.push("<type a path>".to_string());
    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose an image")
        .default(0)
        .items(&items)
        .interact()?;
    if selection == items.len() - 1 {
        prompt_typed_path()
    } else {
        Ok(PathBuf::from(&items[selection]))
    }
}

fn prompt_typed_path() -> Result<PathBuf> {
    let name: String = Input::new().with_prompt("Enter image name").interact_text()?;
    Ok(PathBuf::from(name.trim()))
}

fn find_image_files() -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
                    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                })
        })
        .filter_map(|e| e.path().to_str().map(str::to_string))
        .collect();
    files.sort();
    files
}
