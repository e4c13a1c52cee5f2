// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// unitmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! the utils can be used to parse unit conf file
use crate::error::*;

/// return true if item is 1, yes, y, true, t or on
/// return false if item is 0, no, n, false, f, or off
pub fn parse_boolean(item: &str) -> Result<bool> {
    match &item.to_lowercase() as &str {
        "1" | "yes" | "y" | "true" | "t" | "on" => Ok(true),
        "0" | "no" | "n" | "false" | "f" | "off" => Ok(false),
        _ => Err(Error::Parse {
            source: "wrong boolean value".into(),
        }),
    }
}

#[cfg(test)]
mod test {
    #[test]
    fn test_parse_boolean() {
        use crate::config::parse_boolean;

        assert!(parse_boolean("1").unwrap());
        assert!(parse_boolean("y").unwrap());
        assert!(parse_boolean("yes").unwrap());
        assert!(parse_boolean("TRUE").unwrap());
        assert!(parse_boolean("on").unwrap());

        assert!(!parse_boolean("0").unwrap());
        assert!(!parse_boolean("NO").unwrap());
        assert!(!parse_boolean("off").unwrap());

        assert!(parse_boolean("process").is_err());
        assert!(parse_boolean("in").is_err());
    }
}
