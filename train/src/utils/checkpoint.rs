use crate::{common::*, config::LoadCheckpoint};
use regex::Regex;

pub const FILE_STRFTIME: &str = "%Y-%m-%d-%H-%M-%S.%3f%z";

/// Save parameters to a checkpoint file.
pub fn save_checkpoint(vs: &nn::VarStore, checkpoint_dir: &Path, epoch: usize) -> Result<()> {
    let filename = format!("{}_{:04}.ckpt", Local::now().format(FILE_STRFTIME), epoch);
    let path = checkpoint_dir.join(filename);
    vs.save(&path)?;
    Ok(())
}

/// Load parameters with the specified checkpoint loading method and
/// return the epoch to resume from.
pub fn try_load_checkpoint(
    vs: &mut nn::VarStore,
    logging_dir: &Path,
    load_checkpoint: &LoadCheckpoint,
) -> Result<usize> {
    let checkpoint_filename_regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}\.\d{3}\+\d{4})_(\d{4})\.ckpt$").unwrap();

    let found = match load_checkpoint {
        LoadCheckpoint::Disabled => {
            info!("checkpoint loading is disabled");
            None
        }
        LoadCheckpoint::FromRecent => {
            let paths: Vec<_> =
                glob::glob(&format!("{}/*/checkpoints/*.ckpt", logging_dir.display()))?
                    .try_collect()?;
            let candidates: Vec<_> = paths
                .into_iter()
                .filter_map(|path| {
                    let file_name = path.file_name()?.to_str()?;
                    let captures = checkpoint_filename_regex.captures(file_name)?;
                    let datetime =
                        DateTime::parse_from_str(captures.get(1)?.as_str(), FILE_STRFTIME).ok()?;
                    let epoch: usize = captures.get(2)?.as_str().parse().ok()?;
                    Some((path, datetime, epoch))
                })
                .collect();
            let recent = candidates
                .into_iter()
                .max_by_key(|(_path, datetime, _epoch)| *datetime);

            if recent.is_none() {
                warn!("no checkpoint file found");
            }

            recent.map(|(path, _datetime, epoch)| (path, epoch))
        }
        LoadCheckpoint::FromFile { file } => {
            if file.is_file() {
                let epoch = file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| checkpoint_filename_regex.captures(name))
                    .and_then(|captures| captures.get(2)?.as_str().parse().ok())
                    .unwrap_or(0);
                Some((file.to_owned(), epoch))
            } else {
                warn!("{} is not a file", file.display());
                None
            }
        }
    };

    match found {
        Some((path, epoch)) => {
            info!("load checkpoint file {}", path.display());
            vs.load_partial(path)?;
            Ok(epoch + 1)
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_filename_matches_pattern() {
        let regex = Regex::new(
            r"^(\d{4}-\d{2}-\d{2}-\d{2}-\d{2}-\d{2}\.\d{3}\+\d{4})_(\d{4})\.ckpt$",
        )
        .unwrap();
        let filename = format!("{}_{:04}.ckpt", Local::now().format(FILE_STRFTIME), 7);
        let captures = regex.captures(&filename).unwrap();
        assert_eq!(captures.get(2).unwrap().as_str(), "0007");
    }
}
