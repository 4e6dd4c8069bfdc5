//! Camera capability model.
//!
//! The camera describes its menus, settings codes and localized labels in a
//! vendor-defined descriptor (`?mode=getinfo&type=allmenu`). This module
//! parses that document into a generic [`DescriptorNode`] tree and walks it
//! into a [`CapabilityModel`]: a decode table from raw off-frame codes to
//! [`LabeledCode`](crate::LabeledCode)s per [`SettingCategory`](crate::SettingCategory),
//! and an encode table from logical command ids to
//! [`CommandSpec`](crate::CommandSpec)s.
//!
//! ```rust
//! use lumix_remote::capability::{CapabilityModel, DescriptorNode};
//! use lumix_remote::{LabeledCode, SettingCategory};
//!
//! let xml = r#"<camrply><result>ok</result><menuset model="DC-G9">
//!   <item id="iso_100" cmd_mode="setsetting" cmd_type="iso" cmd_value="100"/>
//! </menuset></camrply>"#;
//!
//! let tree = DescriptorNode::parse_xml(xml)?;
//! let model = CapabilityModel::build(&tree, "en")?;
//! assert_eq!(model.decode(SettingCategory::Iso, 100)?, LabeledCode::new("100", 100));
//! # Ok::<(), lumix_remote::CameraError>(())
//! ```

mod model;
mod tree;

pub use model::{CapabilityModel, SettingEntry};
pub use tree::DescriptorNode;
