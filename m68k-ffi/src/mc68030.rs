// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MC68030 FFI.

use crate::*;

use m68k::model::Mc68030;

cinterface!(mc68030, Mc68030);
