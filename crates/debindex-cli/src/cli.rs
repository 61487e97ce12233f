// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{anyhow, Context, Result},
    clap::{Arg, ArgMatches, Command},
    debindex_core::{config, contents::Contents, distro::Distro, index::SqliteIndex},
    std::{path::Path, sync::Arc},
};

const ABOUT: &str = "\
# About

`debindex` searches a local, incrementally-refreshed index of Debian and
Ubuntu package repositories, and extracts the contents of `.deb` packages
found there.
";

pub fn run() -> Result<()> {
    let app = Command::new("debindex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Search and extract Debian/Ubuntu package contents")
        .long_about(ABOUT)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .takes_value(true)
                .global(true)
                .help("Path to the index file (default: <home>/.godebian.sqlite)"),
        );

    let distro_version = [
        Arg::new("distro").required(true).help("debian or ubuntu"),
        Arg::new("version")
            .required(true)
            .help("Release codename, e.g. stable or focal"),
    ];

    let app = app
        .subcommand(
            Command::new("search")
                .about("Find packages shipping a path or basename")
                .args(&distro_version)
                .arg(Arg::new("path").required(true)),
        )
        .subcommand(
            Command::new("show")
                .about("Show metadata and popularity for a package")
                .args(&distro_version)
                .arg(Arg::new("package").required(true)),
        )
        .subcommand(
            Command::new("download")
                .about("Print the mirror URL for a package's .deb")
                .args(&distro_version)
                .arg(Arg::new("package").required(true)),
        )
        .subcommand(
            Command::new("extract")
                .about("Download and extract a package's .deb into a directory")
                .args(&distro_version)
                .arg(Arg::new("package").required(true))
                .arg(Arg::new("dir").required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("List every (path, package) mapping for an area")
                .args(&distro_version),
        )
        .subcommand(
            Command::new("search-dir-contents")
                .about("Search for every file under a local directory")
                .args(&distro_version)
                .arg(Arg::new("dir").required(true)),
        );

    let matches = app.get_matches();
    let db_path = match matches.value_of("db") {
        Some(path) => path.into(),
        None => config::default_index_path().context("resolving default index path")?,
    };

    let (command, args) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("a subcommand is required"))?;

    match command {
        "search" => command_search(args, &db_path),
        "show" => command_show(args, &db_path),
        "download" => command_download(args, &db_path),
        "extract" => command_extract(args, &db_path),
        "list" => command_list(args, &db_path),
        "search-dir-contents" => command_search_dir_contents(args, &db_path),
        _ => Err(anyhow!("unhandled sub-command: {command}")),
    }
}

fn open_contents(args: &ArgMatches, db_path: &Path) -> Result<Contents> {
    let distro_name = args.value_of("distro").expect("distro is required");
    let version = args.value_of("version").expect("version is required");

    let distro = Distro::parse(distro_name).context("parsing distro argument")?;
    let index = Arc::new(SqliteIndex::open(db_path).context("opening index")?);

    let contents = match distro {
        Distro::Debian => Contents::new_debian(version, index),
        Distro::Ubuntu => Contents::new_ubuntu(version, index),
    }
    .context("refreshing index")?;

    Ok(contents)
}

fn command_search(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let path = args.value_of("path").expect("path is required");
    let contents = open_contents(args, db_path)?;

    for package in contents.search(path).context("searching for path")? {
        println!("{package}");
    }

    Ok(())
}

fn command_show(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let package = args.value_of("package").expect("package is required");
    let contents = open_contents(args, db_path)?;

    let info = contents
        .package_info("amd64", package)
        .context("looking up package info")?;
    let rank = contents.popularity(package).context("looking up popularity")?;

    println!("package:  {}", info.package);
    println!("version:  {}", info.version);
    println!("filename: {}", info.filename);
    println!("depends:  {}", info.depends.join(", "));
    println!("rank:     {rank}");

    Ok(())
}

fn command_download(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let package = args.value_of("package").expect("package is required");
    let contents = open_contents(args, db_path)?;

    let url = contents
        .package_url("amd64", package)
        .context("resolving package url")?;
    println!("{url}");

    Ok(())
}

fn command_extract(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let package = args.value_of("package").expect("package is required");
    let dir = args.value_of("dir").expect("dir is required");
    let contents = open_contents(args, db_path)?;

    std::fs::create_dir_all(dir).context("creating extraction directory")?;

    contents
        .extract("amd64", package, |entry, reader| {
            let path = Path::new(dir).join(entry.path.trim_start_matches("./"));

            if entry.is_dir {
                std::fs::create_dir_all(&path)?;
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut file = std::fs::File::create(&path)?;
            std::io::copy(reader, &mut file)?;
            Ok(())
        })
        .context("extracting package")?;

    Ok(())
}

fn command_list(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let distro_name = args.value_of("distro").expect("distro is required");
    let distro = Distro::parse(distro_name).context("parsing distro argument")?;
    let contents = open_contents(args, db_path)?;

    let area = match distro {
        Distro::Debian => "main",
        Distro::Ubuntu => "",
    };

    contents
        .walk("amd64", area, &mut |path, package| {
            println!("{path}\t{package}");
            true
        })
        .context("walking index")?;

    Ok(())
}

fn command_search_dir_contents(args: &ArgMatches, db_path: &Path) -> Result<()> {
    let dir = args.value_of("dir").expect("dir is required");
    let contents = open_contents(args, db_path)?;

    for entry in walk_local_dir(Path::new(dir))? {
        let path = entry.to_string_lossy().to_string();
        let packages = contents.search(&path).context("searching for path")?;
        if !packages.is_empty() {
            println!("{path}: {}", packages.join(", "));
        }
    }

    Ok(())
}

fn walk_local_dir(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }

    Ok(out)
}
