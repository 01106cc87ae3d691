//! Starter inventory used as the local default and the cloud seed.

use crate::models::{BodyType, FuelType, Transmission, VehicleRecord};

#[allow(clippy::too_many_arguments)]
fn starter(
    id: &str,
    brand: &str,
    model: &str,
    year: i32,
    price: f64,
    mileage: u64,
    fuel_type: FuelType,
    transmission: Transmission,
    body_type: BodyType,
    image: &str,
    description: &str,
    featured: bool,
) -> VehicleRecord {
    VehicleRecord {
        id: id.to_string(),
        brand: brand.to_string(),
        model: model.to_string(),
        year,
        price,
        mileage,
        fuel_type,
        transmission,
        body_type,
        images: vec![image.to_string()],
        description: description.to_string(),
        verified: true,
        featured,
    }
}

/// The fixed starter dataset, in display order.
pub fn starter_inventory() -> Vec<VehicleRecord> {
    vec![
        starter(
            "1",
            "Maruti Suzuki",
            "Swift ZXI",
            2021,
            6.75,
            24000,
            FuelType::Petrol,
            Transmission::Manual,
            BodyType::Hatchback,
            "https://images.unsplash.com/photo-1567818735868-e71b99932e29?auto=format&fit=crop&q=80&w=800",
            "Single owner, pristine condition, regularly serviced at authorized service center.",
            true,
        ),
        starter(
            "2",
            "Hyundai",
            "Creta SX(O)",
            2022,
            15.50,
            12000,
            FuelType::Diesel,
            Transmission::Automatic,
            BodyType::SUV,
            "https://images.unsplash.com/photo-1533473359331-0135ef1b58bf?auto=format&fit=crop&q=80&w=800",
            "Fully loaded variant with panoramic sunroof and ventilated seats.",
            true,
        ),
        starter(
            "3",
            "Honda",
            "City VX",
            2019,
            9.25,
            45000,
            FuelType::Petrol,
            Transmission::Manual,
            BodyType::Sedan,
            "https://images.unsplash.com/photo-1583121274602-3e2820c69888?auto=format&fit=crop&q=80&w=800",
            "Elegant white color, smooth engine, excellent highway performance.",
            false,
        ),
        starter(
            "4",
            "Mahindra",
            "Thar LX 4x4",
            2023,
            16.80,
            8500,
            FuelType::Diesel,
            Transmission::Automatic,
            BodyType::SUV,
            "https://images.unsplash.com/photo-1626242858760-705844e1160d?auto=format&fit=crop&q=80&w=800",
            "Off-road ready, hard top, like-new condition.",
            true,
        ),
        starter(
            "5",
            "Tata",
            "Nexon EV Max",
            2022,
            14.20,
            18000,
            FuelType::Electric,
            Transmission::Automatic,
            BodyType::SUV,
            "https://images.unsplash.com/photo-1619767886558-efdc259cde1a?auto=format&fit=crop&q=80&w=800",
            "Zero emission, high range, fast charging support.",
            false,
        ),
        starter(
            "6",
            "Toyota",
            "Innova Crysta",
            2018,
            18.50,
            82000,
            FuelType::Diesel,
            Transmission::Manual,
            BodyType::SUV,
            "https://images.unsplash.com/photo-1605559424843-9e4c228bf1c2?auto=format&fit=crop&q=80&w=800",
            "The king of reliability. Well maintained 7-seater.",
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_starter_inventory_shape() {
        let cars = starter_inventory();
        assert_eq!(cars.len(), 6);

        let ids: HashSet<_> = cars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 6);

        for car in &cars {
            assert!(!car.brand.is_empty());
            assert!(car.price > 0.0);
            assert!(!car.images.is_empty());
        }
        assert_eq!(cars.iter().filter(|c| c.featured).count(), 3);
    }
}
