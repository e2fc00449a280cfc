// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod users;
pub mod vouchers;
pub mod contracts;
pub mod trash;
pub mod alerts;
pub mod settings;
pub mod importer;
pub mod exporter;
