#![no_main]
use libfuzzer_sys::fuzz_target;
use stateroute::{RouteDeclaration, RouteTree, Solver};

fuzz_target!(|data: (String, Vec<String>)| {
    let Ok(routes) = RouteDeclaration::from_json(&data.0) else {
        return;
    };
    let Ok(tree) = RouteTree::compile(&routes, Solver::default()) else {
        return;
    };

    for url in &data.1 {
        for route in tree.routes() {
            if tree.solver().matches(route.full_path(), url) {
                let _ = route.constraint().captures(route.constraints());
            }
        }
    }
});
