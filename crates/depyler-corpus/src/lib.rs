//! A small, fixed set of decompiled-function fixtures for C4 calibration.
//!
//! These are hand-written stand-ins for a real decompiler export: varied
//! enough (a clean function, a cryptic one, one with a plausible
//! hallucination trap) to give the Calibrator's one-shot pass something
//! meaningful to measure against.

use depyler_hir::{CallEdge, FunctionUnit};

/// Returns the bundled calibration sample set. Deterministic and
/// order-stable across calls.
#[must_use]
pub fn calibration_samples() -> Vec<FunctionUnit> {
    vec![login_check(), buffer_copy(), isolated_helper()]
}

fn login_check() -> FunctionUnit {
    let mut f = FunctionUnit::new(
        "0x401000",
        "sub_401000",
        "undefined4 sub_401000(char *param_1, char *param_2) {\n\
         undefined4 local_8;\n\
         local_8 = strcmp(param_1, param_2);\n\
         return local_8;\n\
         }",
    );
    f.variables.insert("param_1".to_string());
    f.variables.insert("param_2".to_string());
    f.variables.insert("local_8".to_string());
    f.var_types.insert("local_8".to_string(), "undefined4".to_string());
    f.calls.push(CallEdge {
        callee_address: "0x401100".to_string(),
        callee_name: "strcmp".to_string(),
    });
    f.param_count = 2;
    f.return_type = "undefined4".to_string();
    f
}

fn buffer_copy() -> FunctionUnit {
    let mut f = FunctionUnit::new(
        "0x401200",
        "sub_401200",
        "void sub_401200(void *param_1, void *param_2, undefined4 param_3) {\n\
         memcpy(param_1, param_2, param_3);\n\
         return;\n\
         }",
    );
    f.variables.insert("param_1".to_string());
    f.variables.insert("param_2".to_string());
    f.variables.insert("param_3".to_string());
    f.calls.push(CallEdge {
        callee_address: "0x401300".to_string(),
        callee_name: "memcpy".to_string(),
    });
    f.param_count = 3;
    f.return_type = "void".to_string();
    f
}

fn isolated_helper() -> FunctionUnit {
    let mut f = FunctionUnit::new(
        "0x401400",
        "sub_401400",
        "undefined4 sub_401400(void) {\n\
         return 0;\n\
         }",
    );
    f.param_count = 0;
    f.return_type = "undefined4".to_string();
    f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibration_samples_are_non_empty_and_addresses_are_unique() {
        let samples = calibration_samples();
        assert!(!samples.is_empty());
        let mut addresses: Vec<&str> = samples.iter().map(|f| f.address.as_str()).collect();
        addresses.sort_unstable();
        addresses.dedup();
        assert_eq!(addresses.len(), samples.len());
    }

    #[test]
    fn login_check_variables_match_its_code() {
        let samples = calibration_samples();
        let login = samples.iter().find(|f| f.name == "sub_401000").unwrap();
        assert!(login.has_variable("local_8"));
    }
}
