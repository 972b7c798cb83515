// Photo attach: picker request -> object storage upload -> photo message.

use percent_encoding::percent_decode_str;
use url::Url;

use super::*;
use crate::updates::ImagePickerRequest;

pub(crate) const IMAGE_MIME_TYPE: &str = "image/*";
pub(crate) const PICKER_CHOOSER_TITLE: &str = "Complete action using";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum AttachError {
    #[error("picked uri has no path segment: {0}")]
    NoPathSegment(String),
}

/// One picker-to-publish operation. Dropped once the upload resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttachmentUpload {
    pub(crate) source_uri: String,
    pub(crate) destination_path: String,
}

pub(crate) fn image_picker_request() -> ImagePickerRequest {
    ImagePickerRequest {
        mime_type: IMAGE_MIME_TYPE.to_string(),
        local_only: true,
        chooser_title: PICKER_CHOOSER_TITLE.to_string(),
    }
}

/// Storage path for a picked file: `<photos_path>/<last non-empty path segment, decoded>`.
///
/// Two picks that end in the same segment map to the same object and overwrite each other.
pub(crate) fn storage_path_for(photos_path: &str, source_uri: &str) -> Result<String, AttachError> {
    let path = match Url::parse(source_uri) {
        Ok(url) => url.path().to_string(),
        // Bare paths ("/sdcard/DCIM/a.jpg") have no scheme.
        Err(_) => source_uri.to_string(),
    };
    let Some(segment) = path.rsplit('/').find(|s| !s.is_empty()) else {
        return Err(AttachError::NoPathSegment(source_uri.to_string()));
    };
    let segment = percent_decode_str(segment).decode_utf8_lossy();
    Ok(format!("{}/{}", photos_path.trim_end_matches('/'), segment))
}

impl AppCore {
    pub(super) fn pick_photo(&mut self) {
        let rev = self.next_rev();
        let _ = self.update_sender.send(AppUpdate::LaunchImagePicker {
            rev,
            request: image_picker_request(),
        });
    }

    pub(super) fn start_photo_upload(&mut self, source_uri: String) {
        let destination_path = match storage_path_for(&self.config.photos_path(), &source_uri) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%e, "attach: cannot derive storage path");
                self.toast("Could not read the selected photo");
                return;
            }
        };

        self.upload_seq = self.upload_seq.wrapping_add(1);
        let request_id = self.upload_seq;
        tracing::info!(request_id, destination = %destination_path, "attach: upload started");

        self.pending_uploads.insert(
            request_id,
            AttachmentUpload {
                source_uri: source_uri.clone(),
                destination_path: destination_path.clone(),
            },
        );
        self.set_busy(|b| b.uploading_photo = true);
        self.backends
            .storage
            .upload(request_id, source_uri, destination_path);
    }

    pub(super) fn handle_upload_succeeded(&mut self, request_id: u64, download_url: String) {
        let Some(upload) = self.pending_uploads.remove(&request_id) else {
            tracing::debug!(request_id, "attach: ignoring unknown upload");
            return;
        };
        tracing::info!(request_id, destination = %upload.destination_path, "attach: upload finished");
        self.refresh_upload_busy();

        let message = ChatMessage::photo(download_url, self.state.auth.display_name());
        self.publish(message);
    }

    pub(super) fn handle_upload_failed(&mut self, request_id: u64, reason: String) {
        let Some(upload) = self.pending_uploads.remove(&request_id) else {
            tracing::debug!(request_id, "attach: ignoring unknown upload");
            return;
        };
        tracing::warn!(request_id, source = %upload.source_uri, %reason, "attach: upload failed");
        self.refresh_upload_busy();
        self.toast("Photo upload failed");
    }

    fn refresh_upload_busy(&mut self) {
        let uploading = !self.pending_uploads.is_empty();
        self.set_busy(|b| b.uploading_photo = uploading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_path_uses_last_segment_of_content_uri() {
        assert_eq!(
            storage_path_for("chat-photos", "content://media/external/images/media/photo123.jpg")
                .unwrap(),
            "chat-photos/photo123.jpg"
        );
        assert_eq!(
            storage_path_for("chat-photos/", "file:///sdcard/DCIM/IMG_1.png").unwrap(),
            "chat-photos/IMG_1.png"
        );
    }

    #[test]
    fn storage_path_accepts_bare_paths() {
        assert_eq!(
            storage_path_for("chat-photos", "/sdcard/DCIM/a.jpg").unwrap(),
            "chat-photos/a.jpg"
        );
    }

    #[test]
    fn storage_path_decodes_percent_escapes() {
        assert_eq!(
            storage_path_for("chat-photos", "content://media/external/My%20Photo.jpg").unwrap(),
            "chat-photos/My Photo.jpg"
        );
        assert_eq!(
            storage_path_for("chat-photos", "content://media/external/caf%C3%A9.png").unwrap(),
            "chat-photos/café.png"
        );
    }

    #[test]
    fn trailing_slash_uses_last_non_empty_segment() {
        assert_eq!(
            storage_path_for("chat-photos", "content://media/external/images/media/").unwrap(),
            "chat-photos/media"
        );
    }

    #[test]
    fn same_final_segment_collides() {
        let a = storage_path_for("p", "content://picker.one/images/42").unwrap();
        let b = storage_path_for("p", "content://picker.two/other/42").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn uri_without_segment_is_rejected() {
        let err = storage_path_for("chat-photos", "content://media/").unwrap_err();
        assert_eq!(err, AttachError::NoPathSegment("content://media/".into()));
        assert!(storage_path_for("chat-photos", "").is_err());
    }

    #[test]
    fn picker_request_is_local_images_only() {
        let req = image_picker_request();
        assert_eq!(req.mime_type, "image/*");
        assert!(req.local_only);
        assert_eq!(req.chooser_title, "Complete action using");
    }
}
