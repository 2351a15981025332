//! Data layer: record model, file formats, normalization.
//!
//! Architecture:
//! ```text
//!  .mat                 .unv (test-lab)       .unv (reconstructed)
//!    │                      │                       │
//!    │                      │                 ┌──────────┐
//!    │                      │                 │  filter   │  drop type 151 blocks
//!    │                      │                 └──────────┘
//!    ▼                      ▼                       ▼
//!  ┌──────┐             ┌──────────────────────────────┐
//!  │ mat  │             │  unv    text → UnvBlock list  │
//!  └──────┘             └──────────────────────────────┘
//!    │                      │
//!    ▼                      ▼
//!   ┌────────────┐
//!   │ normalize   │  MatVariable / UnvBlock → Record
//!   └────────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ RecordIndex │  identity → Record, browse groups
//!   └─────────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod mat;
pub mod model;
pub mod normalize;
pub mod unv;
