//! Domain model (IDs, descriptors, season, style, errors).
//!
//! - ids: TaskId / ProductId / CategoryId / AssetRef
//! - task / result: ディスク上の記述子（タスクはコア、結果は外部ワーカーが書く）
//! - product: カタログから見える商品
//! - season / style: 背景・アイコン選択とワーカーへのパラメータ

pub mod errors;
pub mod ids;
pub mod product;
pub mod result;
pub mod season;
pub mod style;
pub mod task;

pub use self::errors::{ErrorKind, QueueError};
pub use self::ids::{AssetRef, CategoryId, ProductId, TaskId, TIMESTAMP_FORMAT};
pub use self::product::{PRODUCT_KIND, Product};
pub use self::result::{ResultDescriptor, ResultStatus};
pub use self::season::Season;
pub use self::style::{
    Fonts, LogoRemovalMethod, Palette, ResolvedFonts, SeasonBackgrounds, SeasonIcons, StyleConfig,
    StyleOverrides,
};
pub use self::task::{ProductSnapshot, TYRE_TASK_KIND, TaskDescriptor, TaskStatus, output_filename_for};
