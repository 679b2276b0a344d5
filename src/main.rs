use bazi_core::{
    compute_chart, compute_luck_cycles, generate_analysis, BirthMoment, Gender, MockSource,
};

fn main() {
    // Example usage: 1995-06-15 12:00, solar calendar, male
    let birth = match BirthMoment::new(1995, 6, 15, 12) {
        Ok(birth) => birth,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            return;
        }
    };

    let chart = compute_chart(birth, false, Gender::Male);
    println!("{:#?}", chart);

    let luck = compute_luck_cycles(birth, Gender::Male);
    println!("{:#?}", luck);

    let analysis = generate_analysis(&MockSource, &chart, &["health", "wealth", "career"]);
    println!("{:#?}", analysis);
}
