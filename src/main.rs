use clap::{arg,crate_version,Command};
use voxhive::store::{HiveFile,DEFAULT_VALUE_ATTR};
use voxhive::value::Value;
use voxhive::volume::Volume;

const RCH: &str = "unreachable was reached";

fn describe<T: Value + std::fmt::Display>(file: &HiveFile,name: &str) -> Result<(),voxhive::Error> {
    let vol = Volume::<T>::read_file(file,name)?;
    println!("{} ({})",vol.name(),T::TYPE_TAG);
    if !vol.description().is_empty() {
        println!("  description: {}",vol.description());
    }
    println!("  default: {}",vol.default_value());
    println!("  res: {:?}",vol.res());
    match vol.compute_set_bounds() {
        Some(b) => println!("  set bounds: [{},{},{}] .. [{},{},{})",
            b.min().x,b.min().y,b.min().z,b.max().x,b.max().y,b.max().z),
        None => println!("  set bounds: empty")
    }
    Ok(())
}

fn dump<T: Value + std::fmt::Display>(file: &HiveFile,name: &str) -> Result<(),voxhive::Error> {
    let vol = Volume::<T>::read_file(file,name)?;
    for (c,v) in vol.set_voxels() {
        println!("{} {} {} {}",c.x,c.y,c.z,v);
    }
    Ok(())
}

fn value_tag(file: &HiveFile,name: &str) -> Result<String,voxhive::Error> {
    let group = file.volume_root()?.require_group(name)?;
    Ok(group.scalar(DEFAULT_VALUE_ATTR)?.type_tag.clone())
}

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Inspect:    `voxhive info -i clouds.hive`
Dump:       `voxhive dump -i clouds.hive -n density`";

    let mut main_cmd = Command::new("voxhive")
        .about("Inspect sparse voxel volumes in hive files")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("info")
        .arg(arg!(-i --input <PATH> "hive file").required(true))
        .about("list the volumes in a hive file"));
    main_cmd = main_cmd.subcommand(Command::new("dump")
        .arg(arg!(-i --input <PATH> "hive file").required(true))
        .arg(arg!(-n --name <VOLUME> "volume name").required(true))
        .about("print every set voxel of a volume (may be enormous for filled regions)"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("info") {
        let path = cmd.get_one::<String>("input").expect(RCH);
        let file = HiveFile::open(path)?;
        let names = file.volume_names();
        if names.is_empty() {
            println!("no volumes");
        }
        for name in names {
            match value_tag(&file,&name)?.as_str() {
                "i32" => describe::<i32>(&file,&name)?,
                "f32" => describe::<f32>(&file,&name)?,
                "f64" => describe::<f64>(&file,&name)?,
                tag => eprintln!("{}: unsupported value type {}",name,tag)
            }
        }
    }

    if let Some(cmd) = matches.subcommand_matches("dump") {
        let path = cmd.get_one::<String>("input").expect(RCH);
        let name = cmd.get_one::<String>("name").expect(RCH);
        let file = HiveFile::open(path)?;
        match value_tag(&file,name)?.as_str() {
            "i32" => dump::<i32>(&file,name)?,
            "f32" => dump::<f32>(&file,name)?,
            "f64" => dump::<f64>(&file,name)?,
            tag => {
                eprintln!("{} not supported",tag);
                return Err(Box::new(std::fmt::Error));
            }
        }
    }

    Ok(())
}
