use crate::models::MediaAsset;

pub fn sync(files: &mut Vec<MediaAsset>, snapshot: Vec<MediaAsset>) -> bool {
    if *files == snapshot {
        return false;
    }
    *files = snapshot;
    true
}

pub fn upload(files: &mut Vec<MediaAsset>, asset: MediaAsset) -> bool {
    files.push(asset);
    true
}

pub fn delete(files: &mut Vec<MediaAsset>, id: &str) -> bool {
    let before = files.len();
    files.retain(|f| f.id != id);
    files.len() != before
}
