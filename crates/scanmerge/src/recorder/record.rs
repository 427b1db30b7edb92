//! Building archival records from composite documents.

use crate::assembler::{CompositeDocument, Zone};
use crate::config::RecordDefaults;
use crate::db::case_repo::CaseDetail;
use crate::db::record_repo::RecordRow;

/// The durable row representing one composite document.
pub type ArchivalRecord = RecordRow;

pub const BORROW_STATE: i64 = 0;
pub const INVENTORY_STATUS: i64 = 35;
pub const STATUS: i64 = 6;
pub const SUFFIX: &str = ".pdf";
pub const SYS_FROM: i64 = 5;
pub const SYNC_STATE: i64 = 0;
pub const IS_FULL_TEXT: i64 = 0;
pub const IS_FILE_PDF: i64 = 2;
pub const IS_PUBLIC: i64 = 1;
pub const COMPOSITE_STATUS: i64 = 1;
pub const CHECK_STATUS: i64 = 2;
pub const FILE_STATUS: i64 = 2;
pub const UPDATE_MD5: i64 = 3;
pub const PROCESS_STATE: i64 = 0;
pub const HAS_METADATA: i64 = 2;
pub const IS_CLASSIFIED: i64 = 1;

/// `<archive_code>-<sequence>` with the sequence padded to three digits.
pub fn label(archive_code: &str, sequence: i64) -> String {
    format!("{}-{:03}", archive_code, sequence)
}

pub fn title(zone: Zone) -> String {
    format!("Composite case document ({})", zone)
}

pub fn annotation(document: &CompositeDocument) -> String {
    let mut text = format!(
        "Assembled at: {}, storage: {}",
        document.assembled_at,
        document.storage_dir.display()
    );
    if !document.damaged.is_empty() {
        text.push_str(", damaged images: ");
        text.push_str(&document.damaged.join(";"));
    }
    text
}

/// Assembles the full record for `document` at the given sequence number.
pub fn build_record(
    document: &CompositeDocument,
    detail: &CaseDetail,
    defaults: &RecordDefaults,
    sequence: i64,
) -> ArchivalRecord {
    let pages = document.page_count as i64;
    ArchivalRecord {
        record_id: document.document_id.clone(),
        archives_id: defaults.archives_id.clone(),
        borrow_state: BORROW_STATE,
        inventory_status: INVENTORY_STATUS,
        pdf_size: document.size as i64,
        status: STATUS,
        suffix: SUFFIX.to_string(),
        sys_from: SYS_FROM,
        seq_no: sequence,
        label: label(&detail.archive_code, sequence),
        title: title(document.zone),
        annotation: annotation(document),
        page_count: pages,
        quantity: pages,
        shard_id: document.shard.clone(),
        case_id: document.case_id.clone(),
        sub_project: detail.sub_project.clone(),
        project: detail.project.clone(),
        url: defaults.url.clone(),
        upload_server_id: defaults.upload_server_id,
        server_type: defaults.server_type,
        real_path: defaults.real_path.clone(),
        sync_state: SYNC_STATE,
        md5: document.md5.clone(),
        sm3: document.sm3.clone(),
        is_full_text: IS_FULL_TEXT,
        zone: document.zone.marker(),
        is_file_pdf: IS_FILE_PDF,
        is_public: IS_PUBLIC,
        composite_status: COMPOSITE_STATUS,
        check_status: CHECK_STATUS,
        file_status: FILE_STATUS,
        update_md5: UPDATE_MD5,
        sync_flag: None,
        process_state: PROCESS_STATE,
        has_metadata: HAS_METADATA,
        is_classified: IS_CLASSIFIED,
    }
}
